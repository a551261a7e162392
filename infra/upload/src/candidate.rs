use crate::error::UploadError;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// An untrusted upload: a seekable byte source, the caller's declared content type and,
/// optionally, the caller's filename.
///
/// Both the declared type and the filename are advisory. Neither ever contributes to
/// where or under which name the content is stored.
#[derive(Debug)]
pub struct UploadCandidate<R> {
    reader: R,
    filename: Option<String>,
    content_type: String,
}

impl<R> UploadCandidate<R> {
    pub fn new(reader: R, content_type: impl Into<String>) -> Self {
        Self { reader, filename: None, content_type: content_type.into() }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// The content type exactly as declared by the caller.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub const fn get_ref(&self) -> &R {
        &self.reader
    }

    pub const fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl UploadCandidate<Cursor<Vec<u8>>> {
    /// In-memory candidate.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self::new(Cursor::new(bytes.into()), content_type)
    }
}

impl UploadCandidate<File> {
    /// Opens a local file as a candidate, using its file name as the advisory filename.
    ///
    /// # Errors
    /// [`UploadError::StreamUnavailable`] when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, content_type: impl Into<String>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| UploadError::stream(&e, "Opening upload file"))?;
        let candidate = Self::new(file, content_type);
        Ok(match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => candidate.with_filename(name),
            None => candidate,
        })
    }
}

impl<R: Read + Seek> UploadCandidate<R> {
    /// Total length of the stream. The read position is left where it was.
    ///
    /// # Errors
    /// [`UploadError::StreamUnavailable`] when the stream cannot be seeked.
    pub fn len(&mut self) -> Result<u64, UploadError> {
        restoring_position(&mut self.reader, |r| r.seek(SeekFrom::End(0)))
            .map_err(|e| UploadError::stream(&e, "Measuring upload size"))
    }

    /// Up to `n` bytes from the start of the stream. The read position is left where it was.
    ///
    /// # Errors
    /// [`UploadError::StreamUnavailable`] when the stream cannot be seeked or read.
    pub fn head(&mut self, n: usize) -> Result<Vec<u8>, UploadError> {
        restoring_position(&mut self.reader, |r| {
            r.seek(SeekFrom::Start(0))?;
            let mut buf = Vec::with_capacity(n);
            r.take(n as u64).read_to_end(&mut buf)?;
            Ok(buf)
        })
        .map_err(|e| UploadError::stream(&e, "Reading upload header"))
    }

    /// The whole stream, refusing to buffer more than `limit` bytes.
    /// The read position is left where it was.
    ///
    /// # Errors
    /// * [`UploadError::TooLarge`] when the stream holds more than `limit` bytes.
    /// * [`UploadError::StreamUnavailable`] when the stream cannot be seeked or read.
    pub fn read_all(&mut self, limit: u64) -> Result<Vec<u8>, UploadError> {
        let size = self.len()?;
        if size > limit {
            return Err(UploadError::TooLarge { size, limit, context: None });
        }

        let bytes = restoring_position(&mut self.reader, |r| {
            r.seek(SeekFrom::Start(0))?;
            let mut buf = Vec::new();
            r.take(limit.saturating_add(1)).read_to_end(&mut buf)?;
            Ok(buf)
        })
        .map_err(|e| UploadError::stream(&e, "Reading upload body"))?;

        // The stream may have grown since it was measured.
        let read = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if read > limit {
            return Err(UploadError::TooLarge { size: read, limit, context: None });
        }
        Ok(bytes)
    }
}

/// Runs `op` and seeks back to the original position, even when `op` fails.
fn restoring_position<R, T>(reader: &mut R, op: impl FnOnce(&mut R) -> io::Result<T>) -> io::Result<T>
where
    R: Seek,
{
    let origin = reader.stream_position()?;
    let outcome = op(reader);
    let restored = reader.seek(SeekFrom::Start(origin));
    let value = outcome?;
    restored?;
    Ok(value)
}
