pub(crate) mod compositor;
pub(crate) mod draw;
