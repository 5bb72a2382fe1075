// Internal types shared between services and stores
pub mod audit;
pub mod context;
pub mod device;
