//! Augmentation catalogue and policy decoding.
//!
//! Sampled policies are integer index triples. This module maps them to
//! named operations with a continuous application probability and
//! magnitude level, ready for an image augmentation applier.

mod catalogue;
mod decoder;

pub use catalogue::{augment_list, find_augmentation, Augmentation};
pub use decoder::{random_policy, remove_duplicates, DecodedOp, PolicyDecoder, SubPolicy};
