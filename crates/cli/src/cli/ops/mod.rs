pub mod init;
pub mod publish;
pub mod version;

pub use init::Init;
pub use publish::Publish;
pub use version::Version;
