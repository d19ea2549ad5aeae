// sidetabs services
// Services wrap external collaborators: configuration on disk and content surfaces.

pub mod config_store;
pub mod headless_surface;
pub mod surface_factory;
