#![allow(non_snake_case)]

pub mod authorize;
pub mod claim;
pub mod header;
pub mod overview;
pub mod stake;
pub mod withdraw;
