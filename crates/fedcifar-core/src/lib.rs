//! # fedcifar-core
//!
//! Primitive types shared by the fedcifar crates.
//!
//! This crate provides:
//! - [`Error`] / [`Result`] - the single error type used across the workspace
//! - [`Shape`] / [`CropShape`] - dimension lists and the validated crop target
//! - [`DType`] - element types used to declare record schemas
//! - [`Image`] - an owned height × width × channel pixel buffer
//! - [`consts`] - compile-time CIFAR-100 constants

pub mod consts;
pub mod dtype;
pub mod error;
pub mod image;
pub mod shape;

pub use dtype::{DType, WithDType};
pub use error::{Error, Result};
pub use image::Image;
pub use shape::{CropShape, Shape};
