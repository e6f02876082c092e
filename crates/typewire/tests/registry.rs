//! Property tests for frames going through a sealed registry and the
//! dispatcher.

use std::sync::Arc;

use bytes::Bytes;
use proptest::prelude::*;
use typewire::codec::{BlockPos, Tag, TagMap, MAX_DEPTH};
use typewire::prelude::*;
use typewire::{DecodeError, DispatchError, Dispatcher, Inbound};

#[derive(Debug, Clone, PartialEq)]
struct Chat {
    channel: u8,
    text: String,
    mentions: Vec<String>,
    at: Option<BlockPos>,
}
wire_struct!(Chat { channel, text, mentions, at });
message!(Chat => Server);

#[derive(Debug, Clone, PartialEq)]
struct Sign {
    lines: TagMap,
}
wire_struct!(Sign { lines });
message!(Sign => Server);

fn registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    registry.register::<Chat>().unwrap();
    registry.register::<Sign>().unwrap();
    registry.on_server::<Chat>(|_, _| {}).unwrap();
    registry.on_server::<Sign>(|_, _| {}).unwrap();
    registry.seal().unwrap();
    Arc::new(registry)
}

fn from_client(data: Vec<u8>) -> Inbound {
    Inbound {
        data: Bytes::from(data),
        sender: SenderContext::Endpoint(EndpointId::new(1)),
    }
}

fn chat() -> impl Strategy<Value = Chat> {
    (
        any::<u8>(),
        ".{0,24}",
        prop::collection::vec("[a-z]{1,8}", 0..4),
        prop::option::of((any::<i32>(), any::<i32>(), any::<i32>())),
    )
        .prop_map(|(channel, text, mentions, at)| Chat {
            channel,
            text,
            mentions,
            at: at.map(|(x, y, z)| BlockPos::new(x, y, z)),
        })
}

proptest! {
    #[test]
    fn test_registry_round_trip(message in chat()) {
        let registry = registry();
        let frame = registry.encode(&message).unwrap();
        prop_assert_eq!(frame[0], 0);

        let decoded = registry.decode(&frame).unwrap();
        prop_assert_eq!(decoded.name, "Chat");
        prop_assert_eq!(decoded.downcast::<Chat>().unwrap(), message);
    }

    #[test]
    fn test_dispatch_never_panics_on_garbage(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let dispatcher = Dispatcher::new(registry()).unwrap();
        // Either handled without a reply or rejected; never a panic.
        if let Ok(reply) = dispatcher.dispatch(&from_client(data)) {
            prop_assert!(reply.is_none());
        }
    }
}

#[test]
fn test_hostile_nesting_is_rejected_by_the_dispatcher() {
    // Sign { lines: {"": List[List[List[...]]]} }, far deeper than allowed.
    let mut frame = vec![1, 0, 0, 0, 1, 0];
    frame.extend([9, 0, 0, 0, 1].repeat(5000));
    frame.extend([1, 0]);

    let dispatcher = Dispatcher::new(registry()).unwrap();
    let err = dispatcher.dispatch(&from_client(frame)).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Decode(DecodeError::TooDeep { max: MAX_DEPTH })
    ));

    // The dispatcher is unaffected.
    let mut lines = TagMap::new();
    lines.insert("1".into(), Tag::from("hello"));
    let frame = dispatcher.registry().encode(&Sign { lines }).unwrap();
    assert!(dispatcher.dispatch(&from_client(frame.to_vec())).unwrap().is_none());
}
