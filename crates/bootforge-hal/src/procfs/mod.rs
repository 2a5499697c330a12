pub mod cpuinfo;
pub mod meminfo;
pub mod mountinfo;
