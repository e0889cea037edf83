pub mod checkpoint_repo;

pub use checkpoint_repo::FlowCheckpointRepo;
