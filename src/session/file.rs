use crate::{
    Error, Result,
    protocol::{Request, Response, Transport, family},
    records::{DirectoryEntry, FileContent, decode_file_content, decode_listing},
};

use super::{Connection, required};

/// Message the server answers an existence check with when the path is absent.
const PATH_NOT_FOUND: &str = "The system cannot find the path specified: ";

impl<T: Transport> Connection<T> {
    /// Lists the entries of a remote directory.
    pub fn browse_dir(&mut self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let request = Ok(Request::new(family::BROWSE_DIR).arg(path).arg(""));
        self.call(request, |r| Ok(decode_listing(r)?))
    }

    pub fn read_file(&mut self, pathname: &str) -> Result<FileContent> {
        let request = file_io(pathname, "READ").map(|r| r.arg(""));
        self.call(request, |r| Ok(decode_file_content(r)?))
    }

    /// Replaces the contents of a remote file, creating it if needed.
    pub fn write_file(&mut self, pathname: &str, data: &[u8]) -> Result<()> {
        let request = file_io(pathname, "WRITE").map(|r| r.arg("").arg(data));
        self.call(request, |_| Ok(()))
    }

    pub fn rename(&mut self, current: &str, new: &str) -> Result<()> {
        let request = required("new pathname", new)
            .and_then(|new| file_io(current, "RENAME").map(|r| r.arg("").arg(new)));
        self.call(request, |_| Ok(()))
    }

    pub fn remove_file(&mut self, pathname: &str) -> Result<()> {
        let request = file_io(pathname, "REMOVE").map(|r| r.arg("").arg("F"));
        self.call(request, |_| Ok(()))
    }

    pub fn remove_dir(&mut self, path: &str) -> Result<()> {
        let request = file_io(path, "REMOVE").map(|r| r.arg("").arg("D"));
        self.call(request, |_| Ok(()))
    }

    /// Whether a remote file or directory exists.
    ///
    /// The server reports a missing path as an error; that error is turned into `false`
    /// and not recorded.
    pub fn exists(&mut self, pathname: &str) -> Result<bool> {
        let request = file_io(pathname, "EXISTENCE").map(|r| r.arg("").arg(""));
        match self.call(request, |_| Ok(true)) {
            Err(Error::Server { code: -1, message }) if message.starts_with(PATH_NOT_FOUND) => {
                self.clear_error();
                Ok(false)
            }
            result => result,
        }
    }

    pub fn create_dir(&mut self, path: &str) -> Result<()> {
        let request = file_io(path, "CREATE").map(|r| r.arg("").arg(""));
        self.call(request, |_| Ok(()))
    }

    /// Root directory of the ColdFusion installation.
    pub fn root_dir(&mut self) -> Result<String> {
        let request = Ok(Request::new(family::FILE_IO).arg("").arg("CF_DIRECTORY"));
        self.call(request, Response::single_string)
    }
}

fn file_io(pathname: &str, operation: &str) -> Result<Request> {
    let pathname = required("pathname", pathname)?;
    Ok(Request::new(family::FILE_IO).arg(pathname).arg(operation))
}
