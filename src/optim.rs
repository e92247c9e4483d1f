//! Gradient-based parameter update rules.
//!
//! Optimizers are stateful: momentum and moment buffers are allocated
//! lazily on the first step, keyed by parameter position, so the same
//! optimizer instance must always be stepped with the same parameter
//! list. `reset()` drops all accumulated state.

use ndarray::{Array2, Zip};

use crate::errors::TrainError;

/// Update rule applied to a model's parameter tensors.
pub trait Optimizer {
    /// Apply one update. `parameters` and `gradients` are parallel lists;
    /// entry `i` of each refers to the same tensor.
    fn step(
        &mut self,
        parameters: Vec<&mut Array2<f32>>,
        gradients: &[Array2<f32>],
    ) -> Result<(), TrainError>;

    fn set_learning_rate(&mut self, learning_rate: f32);

    fn learning_rate(&self) -> f32;

    /// Clear accumulated optimizer state (momentum, moment estimates).
    fn reset(&mut self);
}

fn check_step_inputs(
    parameters: &[&mut Array2<f32>],
    gradients: &[Array2<f32>],
) -> Result<(), TrainError> {
    if parameters.len() != gradients.len() {
        return Err(TrainError::DimensionMismatch(format!(
            "{} parameter tensors but {} gradient tensors",
            parameters.len(),
            gradients.len()
        )));
    }
    for (i, (param, grad)) in parameters.iter().zip(gradients.iter()).enumerate() {
        if param.dim() != grad.dim() {
            return Err(TrainError::DimensionMismatch(format!(
                "tensor {}: parameter is {:?} but gradient is {:?}",
                i,
                param.dim(),
                grad.dim()
            )));
        }
    }
    Ok(())
}

/// Stochastic gradient descent with optional momentum.
#[derive(Debug, Clone)]
pub struct Sgd {
    learning_rate: f32,
    momentum: f32,
    velocity: Vec<Array2<f32>>,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            momentum: 0.0,
            velocity: Vec::new(),
        }
    }

    pub fn with_momentum(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: Vec::new(),
        }
    }
}

impl Optimizer for Sgd {
    fn step(
        &mut self,
        mut parameters: Vec<&mut Array2<f32>>,
        gradients: &[Array2<f32>],
    ) -> Result<(), TrainError> {
        check_step_inputs(&parameters, gradients)?;

        if self.momentum == 0.0 {
            for (param, grad) in parameters.iter_mut().zip(gradients.iter()) {
                param.scaled_add(-self.learning_rate, grad);
            }
            return Ok(());
        }

        if self.velocity.is_empty() {
            self.velocity = gradients.iter().map(|g| Array2::zeros(g.dim())).collect();
        }
        for ((param, grad), velocity) in parameters
            .iter_mut()
            .zip(gradients.iter())
            .zip(self.velocity.iter_mut())
        {
            velocity.mapv_inplace(|v| v * self.momentum);
            velocity.scaled_add(1.0, grad);
            param.scaled_add(-self.learning_rate, velocity);
        }
        Ok(())
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn reset(&mut self) {
        self.velocity.clear();
    }
}

/// Adam with bias-corrected first and second moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    first_moment: Vec<Array2<f32>>,
    second_moment: Vec<Array2<f32>>,
    step_count: u64,
}

impl Adam {
    /// Adam with `lr = 0.001`, `beta1 = 0.9`, `beta2 = 0.999`, `eps = 1e-7`.
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            first_moment: Vec::new(),
            second_moment: Vec::new(),
            step_count: 0,
        }
    }

    pub fn with_betas(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            first_moment: Vec::new(),
            second_moment: Vec::new(),
            step_count: 0,
        }
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.001)
    }
}

impl Optimizer for Adam {
    fn step(
        &mut self,
        mut parameters: Vec<&mut Array2<f32>>,
        gradients: &[Array2<f32>],
    ) -> Result<(), TrainError> {
        check_step_inputs(&parameters, gradients)?;

        if self.first_moment.is_empty() {
            self.first_moment = gradients.iter().map(|g| Array2::zeros(g.dim())).collect();
            self.second_moment = gradients.iter().map(|g| Array2::zeros(g.dim())).collect();
        }

        self.step_count += 1;
        let t = self.step_count as f32;
        let correction1 = 1.0 - self.beta1.powf(t);
        let correction2 = 1.0 - self.beta2.powf(t);
        let lr = self.learning_rate;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);

        for (((param, grad), m), v) in parameters
            .iter_mut()
            .zip(gradients.iter())
            .zip(self.first_moment.iter_mut())
            .zip(self.second_moment.iter_mut())
        {
            Zip::from(&mut **param)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    *p -= lr * m_hat / (v_hat.sqrt() + epsilon);
                });
        }
        Ok(())
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn reset(&mut self) {
        self.first_moment.clear();
        self.second_moment.clear();
        self.step_count = 0;
    }
}
