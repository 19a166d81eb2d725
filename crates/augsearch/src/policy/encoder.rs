//! Convolutional image encoder.

use tch::{nn, nn::ModuleT, Tensor};

/// Convolutional image encoder producing the controller's first recurrent input.
///
/// Three stride-2 convolutions (the last two batch-normalized), a 2x2 average
/// pool, then a linear projection to `out_size`:
/// `[batch, C, H, W] -> [batch, out_size]`.
#[derive(Debug)]
pub struct ImageEncoder {
    features: nn::SequentialT,
    input_shape: [i64; 3],
    feature_dim: i64,
}

impl ImageEncoder {
    /// Create a new encoder under `path`
    ///
    /// # Arguments
    /// * `path` - Variable path (weights land under `path/...`)
    /// * `input_shape` - `[channels, height, width]` of incoming images
    /// * `out_size` - Width of the produced feature vector
    pub fn new(path: &nn::Path, input_shape: [i64; 3], out_size: i64) -> Self {
        let [channels, height, width] = input_shape;
        let conv = |p: nn::Path, c_in, c_out| {
            nn::conv2d(
                p,
                c_in,
                c_out,
                3,
                nn::ConvConfig {
                    stride: 2,
                    padding: 1,
                    ..Default::default()
                },
            )
        };

        // Output size of a k=3, s=2, p=1 convolution
        let calc_conv = |size: i64| (size + 2 - 3) / 2 + 1;
        let h = calc_conv(calc_conv(calc_conv(height))) / 2;
        let w = calc_conv(calc_conv(calc_conv(width))) / 2;
        let feature_dim = 64 * h * w;

        let features = nn::seq_t()
            .add(conv(path / "c1", channels, 16))
            .add_fn(|x| x.relu())
            .add(conv(path / "c2", 16, 32))
            .add(nn::batch_norm2d(path / "bn2", 32, Default::default()))
            .add_fn(|x| x.relu())
            .add(conv(path / "c3", 32, 64))
            .add(nn::batch_norm2d(path / "bn3", 64, Default::default()))
            .add_fn(|x| x.relu())
            .add_fn(|x| x.avg_pool2d_default(2))
            .add_fn(|x| x.flatten(1, -1))
            .add(nn::linear(path / "fc", feature_dim, out_size, Default::default()));

        Self {
            features,
            input_shape,
            feature_dim,
        }
    }

    /// Expected `[channels, height, width]`
    pub fn input_shape(&self) -> [i64; 3] {
        self.input_shape
    }

    /// Flattened feature size fed to the final projection
    pub fn feature_dim(&self) -> i64 {
        self.feature_dim
    }

    /// Encode an image batch; `train` selects batch-norm batch statistics
    pub fn forward_t(&self, images: &Tensor, train: bool) -> Tensor {
        self.features.forward_t(images, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_encoder_cifar_shape() {
        let vs = nn::VarStore::new(Device::Cpu);
        let encoder = ImageEncoder::new(&(vs.root() / "encoder"), [3, 32, 32], 100);
        assert_eq!(encoder.feature_dim(), 64 * 2 * 2);

        let images = Tensor::randn([4, 3, 32, 32], (Kind::Float, Device::Cpu));
        let out = encoder.forward_t(&images, false);
        assert_eq!(out.size(), [4, 100]);
    }

    #[test]
    fn test_encoder_non_square_input() {
        let vs = nn::VarStore::new(Device::Cpu);
        let encoder = ImageEncoder::new(&vs.root(), [1, 64, 48], 32);
        let images = Tensor::randn([2, 1, 64, 48], (Kind::Float, Device::Cpu));
        let out = encoder.forward_t(&images, true);
        assert_eq!(out.size(), [2, 32]);
    }
}
