use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::config::ProtocolConfig;

/// Implements Stream<Item=io::Result<BytesMut>> and Sink<Bytes>.
pub(crate) type Transport<RW> = Framed<RW, LengthDelimitedCodec>;

/// Splits a byte stream into length-delimited frames.
pub(crate) fn frame<RW: AsyncRead + AsyncWrite>(
    read_write: RW,
    config: &ProtocolConfig,
) -> Transport<RW> {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(config.max_frame_length)
        .new_codec();
    Framed::new(read_write, codec)
}
