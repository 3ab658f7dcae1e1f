pub mod assembler;
pub mod cli;
pub mod db;
pub mod entities;
pub mod error;
pub mod model;
pub mod repository;
pub mod store;
pub mod util;
pub mod wizard;
