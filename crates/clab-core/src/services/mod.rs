pub mod exec;
pub mod fs_utils;
pub mod kinds;
pub mod lab;
pub mod mysocketio;
pub mod provisioner;
pub mod registry;
pub mod runtime;
pub mod staging;
pub mod state;
pub mod templates;
pub mod topology_loader;
