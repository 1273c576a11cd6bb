pub mod bucket;
pub mod computer;
pub mod joiner;
pub mod manager;
pub mod matcher;
pub mod normalize;
pub mod project_org;
pub mod voter;
