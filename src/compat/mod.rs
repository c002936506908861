//! Loaders for externally trained models.

pub mod lightgbm;
