use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("page access out of bounds: offset {offset} + {len} bytes exceeds page size {page_size}")]
    BoundsExceeded {
        offset: usize,
        len: usize,
        page_size: usize,
    },
}
