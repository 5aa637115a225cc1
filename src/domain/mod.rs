// Domain layer: catalog import models and the ports (interfaces) to the remote catalog.

pub mod model;
pub mod ports;
