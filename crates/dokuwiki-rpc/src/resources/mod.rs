//! Resource namespaces for the wiki API.

mod media;
mod pages;

pub use media::MediaResource;
pub use pages::PagesResource;
