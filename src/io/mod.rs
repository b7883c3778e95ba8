// Purpose - external sample formats

pub mod pcm;

pub use pcm::Endianness;
