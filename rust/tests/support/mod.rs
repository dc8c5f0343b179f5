#![allow(dead_code)]

mod helpers;
mod server;

pub use helpers::*;
pub use server::*;
