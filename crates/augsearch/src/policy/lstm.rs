//! Recurrent core of the controller.

use tch::{nn, nn::RNN, Tensor};

/// LSTM hidden and cell state, each `[num_layers, batch, hidden]`.
///
/// Held as a value and threaded through every step; the controller never
/// stores it between calls.
pub struct RecurrentState(nn::LSTMState);

impl RecurrentState {
    pub fn h(&self) -> Tensor {
        self.0.h()
    }

    pub fn c(&self) -> Tensor {
        self.0.c()
    }
}

/// Stacked LSTM stepping one token at a time.
#[derive(Debug)]
pub struct RecurrentCore {
    lstm: nn::LSTM,
    hidden_size: i64,
    num_layers: i64,
}

impl RecurrentCore {
    /// Create a new core with `input_size == hidden_size`
    pub fn new(path: &nn::Path, hidden_size: i64, num_layers: i64) -> Self {
        let config = nn::RNNConfig {
            num_layers,
            batch_first: true,
            ..Default::default()
        };
        let lstm = nn::lstm(path, hidden_size, hidden_size, config);
        Self {
            lstm,
            hidden_size,
            num_layers,
        }
    }

    pub fn hidden_size(&self) -> i64 {
        self.hidden_size
    }

    pub fn num_layers(&self) -> i64 {
        self.num_layers
    }

    /// Zero state for a fresh generation
    pub fn zero_state(&self, batch_size: i64) -> RecurrentState {
        RecurrentState(self.lstm.zero_state(batch_size))
    }

    /// One recurrent step.
    ///
    /// `input` is `[batch, hidden]`; returns the top layer output
    /// `[batch, hidden]` and the next state.
    pub fn step(&self, input: &Tensor, state: RecurrentState) -> (Tensor, RecurrentState) {
        // [batch, 1, hidden] with batch_first
        let (output, next) = self.lstm.seq_init(&input.unsqueeze(1), &state.0);
        (output.squeeze_dim(1), RecurrentState(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_step_shapes() {
        let vs = nn::VarStore::new(Device::Cpu);
        let core = RecurrentCore::new(&(vs.root() / "lstm"), 16, 2);

        let state = core.zero_state(5);
        assert_eq!(state.h().size(), [2, 5, 16]);

        let input = Tensor::randn([5, 16], (Kind::Float, Device::Cpu));
        let (output, next) = core.step(&input, state);
        assert_eq!(output.size(), [5, 16]);
        assert_eq!(next.c().size(), [2, 5, 16]);

        // Output is the top layer's hidden state
        assert!(output.allclose(&next.h().get(1), 1e-6, 1e-6, false));
    }

    #[test]
    fn test_state_carries_history() {
        let vs = nn::VarStore::new(Device::Cpu);
        let core = RecurrentCore::new(&vs.root(), 8, 1);
        let input = Tensor::randn([1, 8], (Kind::Float, Device::Cpu));

        let (first, state) = core.step(&input, core.zero_state(1));
        let (second, _) = core.step(&input, state);
        assert!(!first.allclose(&second, 1e-6, 1e-6, false));
    }
}
