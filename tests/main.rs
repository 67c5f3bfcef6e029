mod mock;

mod bidirectional;
mod concurrency;
mod leaf;
mod observed;
