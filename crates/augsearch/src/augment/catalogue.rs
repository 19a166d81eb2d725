//! Augmentation operations and their magnitude ranges.

use serde::Serialize;

/// A named image operation with its magnitude range
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Augmentation {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

impl Augmentation {
    const fn new(name: &'static str, min: f64, max: f64) -> Self {
        Self { name, min, max }
    }
}

const AUGMENTATIONS: [Augmentation; 15] = [
    Augmentation::new("ShearX", -0.3, 0.3),
    Augmentation::new("ShearY", -0.3, 0.3),
    Augmentation::new("TranslateX", -0.45, 0.45),
    Augmentation::new("TranslateY", -0.45, 0.45),
    Augmentation::new("Rotate", -30.0, 30.0),
    Augmentation::new("AutoContrast", 0.0, 1.0),
    Augmentation::new("Invert", 0.0, 1.0),
    Augmentation::new("Equalize", 0.0, 1.0),
    Augmentation::new("Solarize", 0.0, 256.0),
    Augmentation::new("Posterize", 4.0, 8.0),
    Augmentation::new("Contrast", 0.1, 1.9),
    Augmentation::new("Color", 0.1, 1.9),
    Augmentation::new("Brightness", 0.1, 1.9),
    Augmentation::new("Sharpness", 0.1, 1.9),
    Augmentation::new("Cutout", 0.0, 0.2),
];

/// The operation catalogue, indexed by operation type
pub fn augment_list() -> &'static [Augmentation] {
    &AUGMENTATIONS
}

/// Look up an operation by name (case-insensitive)
pub fn find_augmentation(name: &str) -> Option<(usize, Augmentation)> {
    AUGMENTATIONS
        .iter()
        .enumerate()
        .find(|(_, aug)| aug.name.eq_ignore_ascii_case(name))
        .map(|(i, aug)| (i, *aug))
}
