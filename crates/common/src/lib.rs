pub mod config;
pub mod db;
pub mod neynar;
pub mod observability;
pub mod types;
pub mod zerion;
