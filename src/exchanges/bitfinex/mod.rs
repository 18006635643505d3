pub mod builder;
pub mod codec;
pub mod private;
pub mod public;
pub mod registry;
pub mod router;
pub mod signer;
pub mod types;

// Re-export main components
pub use builder::{build_private_ws, build_public_ws};
pub use codec::{BitfinexCodec, BitfinexPrivateCodec, DataFrame, PrivateFrame, PublicFrame};
pub use private::{BitfinexPrivateWs, PrivateState, TermSink};
pub use public::BitfinexPublicWs;
pub use registry::SubscriptionRegistry;
pub use router::{ChannelBinding, ChannelRouter, Delivery};
pub use signer::BitfinexSigner;
pub use types::{
    pairs, AuthRequest, AuthResponse, EventMessage, SubscribeMsg, Subscription, TermRecord,
    TopicKind,
};
