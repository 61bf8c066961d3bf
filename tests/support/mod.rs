#![allow(dead_code)]

pub mod payload;
pub mod wait;
