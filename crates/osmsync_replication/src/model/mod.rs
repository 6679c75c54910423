//! Entity model.

mod entity;
mod history;

pub use entity::{Entity, EntityHeader, EntityType, Node, OsmEntity, Relation, RelationMember, Tag, Way, WayNode};
pub use history::{EntityHistory, FeatureRow};
