mod credentials;
mod signature;

pub use credentials::Credentials;
pub use signature::{
    AuthHeaders, SignableRequest, SignedRequest, encode_segment, host_header, payload_hash, prepare,
    sign,
};
