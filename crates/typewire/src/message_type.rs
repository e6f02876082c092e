//! Message types and their direction.
//!
//! Every type that travels as a top-level frame implements [`Message`],
//! which names it and lists the sides that receive it. The marker traits
//! [`ToServer`] and [`ToClient`] follow from that list, and the typed send
//! methods on [`Channel`](crate::Channel) require them. Sending a
//! server-bound message to a client is then a compile error rather than a
//! frame dropped at runtime.
//!
//! Implement all three with [`message!`](crate::message):
//!
//! ```
//! use typewire::{message, wire_struct};
//!
//! struct Ping { seq: u32 }
//! wire_struct!(Ping { seq });
//! message!(Ping => Server);
//!
//! struct Chat { text: String }
//! wire_struct!(Chat { text });
//! message!(Chat => Client, Server);
//! ```
//!
//! A client-bound message doesn't satisfy [`ToServer`]:
//!
//! ```compile_fail
//! use typewire::{message, wire_struct, ToServer};
//!
//! struct Pong { seq: u32 }
//! wire_struct!(Pong { seq });
//! message!(Pong => Client);
//!
//! fn upstream<M: ToServer>(_: &M) {}
//! upstream(&Pong { seq: 1 });
//! ```

use crate::Side;

/// A type that can be registered as a top-level message.
pub trait Message: Send + Sized + 'static {
    /// Name used in logs and errors.
    const NAME: &'static str;

    /// Sides that have to handle this message.
    const RECEIVERS: &'static [Side];

    /// Returns `true` if `side` receives this message.
    fn received_on(side: Side) -> bool {
        Self::RECEIVERS.contains(&side)
    }
}

/// Marker: the server receives this message.
pub trait ToServer: Message {}

/// Marker: clients receive this message.
pub trait ToClient: Message {}

/// Implements [`Message`] and its direction markers for a type.
///
/// `message!(Ping => Server)`, `message!(Pong => Client)`, or both:
/// `message!(Chat => Client, Server)`.
///
/// A generic type is declared once per concrete instantiation, e.g.
/// `message!(Envelope<Ping> => Server)`; each instantiation is its own
/// message type with its own discriminator.
#[macro_export]
macro_rules! message {
    (@marker $ty:ty, Server) => {
        impl $crate::ToServer for $ty {}
    };
    (@marker $ty:ty, Client) => {
        impl $crate::ToClient for $ty {}
    };
    ($ty:ty => $($side:ident),+ $(,)?) => {
        impl $crate::Message for $ty {
            const NAME: &'static str = ::core::stringify!($ty);
            const RECEIVERS: &'static [$crate::Side] = &[$($crate::Side::$side),+];
        }
        $( $crate::message!(@marker $ty, $side); )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;
    crate::message!(Ping => Server);

    struct Chat;
    crate::message!(Chat => Client, Server);

    struct Envelope<T>(T);
    crate::message!(Envelope<u8> => Client);

    fn assert_to_server<T: ToServer>() {}
    fn assert_to_client<T: ToClient>() {}

    #[test]
    fn test_receivers_follow_declaration() {
        assert_eq!(Ping::NAME, "Ping");
        assert_eq!(Ping::RECEIVERS, &[Side::Server]);
        assert!(Ping::received_on(Side::Server));
        assert!(!Ping::received_on(Side::Client));
    }

    #[test]
    fn test_generic_instantiation_is_a_message() {
        assert_to_client::<Envelope<u8>>();
        assert_eq!(Envelope::<u8>::RECEIVERS, &[Side::Client]);
        assert!(Envelope::<u8>::NAME.starts_with("Envelope"));
        let _ = Envelope(0u8).0;
    }

    #[test]
    fn test_both_directions_get_both_markers() {
        assert_to_server::<Chat>();
        assert_to_client::<Chat>();
        assert_to_server::<Ping>();
        assert!(Chat::received_on(Side::Client));
    }
}
