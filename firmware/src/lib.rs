#![no_std]

extern crate alloc;

pub mod framebuffer;
pub mod panel;
pub mod platform;
pub mod transport;
