use crate::{buffer::DecodeError, protocol::Response};

use super::expect_count;

/// Contents of a remote file as returned by `FILEIO READ`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub data: Vec<u8>,
    pub modified: String,
    pub permission: String,
}

impl FileContent {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

pub fn decode_file_content(response: &Response) -> Result<FileContent, DecodeError> {
    expect_count(response.count(), 3)?;

    let mut fields = response.fields();
    let data = fields.bytes()?.to_vec();
    let modified = fields.string()?;
    let permission = fields.string()?;

    Ok(FileContent {
        data,
        modified,
        permission,
    })
}
