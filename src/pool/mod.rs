pub(crate) mod priority;
pub(crate) mod slots;
pub(crate) mod task;
pub(crate) mod thread_pool;
