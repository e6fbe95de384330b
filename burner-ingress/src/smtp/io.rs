/*
 * burner.kiwi disposable mail service
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
/// Line oriented wrapper of a stream.
///
/// Bytes read past the end of a line stay in the buffer, a read interrupted by a timeout
/// loses nothing.
#[derive(Debug)]
pub struct AbstractIO<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    ///
    pub inner: S,
    buf: Vec<u8>,
}

const BUFFER_SIZE: usize = 1024;

impl<S> AbstractIO<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    ///
    pub const fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buf: Vec::new(),
        }
    }

    /// Read the next line, without its line ending.
    ///
    /// Returns `None` at the end of the stream. Invalid utf8 sequences are replaced.
    ///
    /// # Errors
    ///
    /// * no line received before `timeout` (`TimedOut`)
    /// * the line is longer than `line_max` (`InvalidData`)
    /// * stream's error
    pub async fn next_line(
        &mut self,
        timeout: std::time::Duration,
        line_max: usize,
    ) -> std::io::Result<Option<String>> {
        tokio::time::timeout(timeout, self.read_line(line_max))
            .await
            .map_err(|t| std::io::Error::new(std::io::ErrorKind::TimedOut, t))?
    }

    async fn read_line(&mut self, line_max: usize) -> std::io::Result<Option<String>> {
        loop {
            if let Some(i) = self.buf.iter().position(|b| *b == b'\n') {
                let mut line = self.buf.drain(..=i).collect::<Vec<u8>>();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.buf.len() > line_max {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "line too long",
                ));
            }

            let mut raw = [0; BUFFER_SIZE];
            let read = tokio::io::AsyncReadExt::read(&mut self.inner, &mut raw).await?;
            if read == 0 {
                return Ok(None);
            }
            self.buf.extend_from_slice(&raw[..read]);
        }
    }

    /// Write and flush `bytes`.
    ///
    /// # Errors
    ///
    /// * not written before `timeout` (`TimedOut`)
    /// * stream's error
    pub async fn write_all(
        &mut self,
        bytes: &[u8],
        timeout: std::time::Duration,
    ) -> std::io::Result<()> {
        tokio::time::timeout(timeout, async {
            tokio::io::AsyncWriteExt::write_all(&mut self.inner, bytes).await?;
            tokio::io::AsyncWriteExt::flush(&mut self.inner).await
        })
        .await
        .map_err(|t| std::io::Error::new(std::io::ErrorKind::TimedOut, t))?
    }
}
