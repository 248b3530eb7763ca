//! Rules on class instantiation and static members.

mod access_static_properties;
mod instantiation;

pub use access_static_properties::AccessStaticPropertiesRule;
pub use instantiation::InstantiationRule;
