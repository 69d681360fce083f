use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, warn};

use sanban_core::{decode, encode, ClientMsg, ServerMsg};

/// Callbacks a transport implementation invokes as link events happen.
///
/// Implementations must deliver these from their event loop, never from
/// inside `open`/`send`/`close` — the channel may be mid-mutation when those
/// are called.
#[derive(Clone)]
pub struct TransportSink {
    on_open: Rc<dyn Fn()>,
    on_frame: Rc<dyn Fn(Vec<u8>)>,
    on_close: Rc<dyn Fn()>,
}

impl TransportSink {
    pub fn opened(&self) {
        (self.on_open)();
    }

    pub fn frame(&self, bytes: Vec<u8>) {
        (self.on_frame)(bytes);
    }

    pub fn closed(&self) {
        (self.on_close)();
    }
}

/// A persistent bidirectional link to one named room. The concrete socket
/// (browser, native, scripted) lives behind this seam.
pub trait SessionTransport {
    fn open(&mut self, url: &str, credential: &str, sink: TransportSink);
    fn send(&mut self, bytes: Vec<u8>);
    fn close(&mut self);
    fn is_open(&self) -> bool;
}

/// Lifecycle callbacks the channel owner installs once per connection.
#[derive(Clone)]
pub struct ChannelCallbacks {
    /// Link established; the owner is expected to issue a room join.
    pub on_open: Rc<dyn Fn()>,
    /// Decoded authoritative message.
    pub on_message: Rc<dyn Fn(ServerMsg)>,
    /// Link dropped (not locally closed); `connected` and `joined` are
    /// already false when this fires.
    pub on_drop: Rc<dyn Fn()>,
}

/// Wraps a transport with the two-stage membership the authority requires:
/// `connected` is the link, `joined` is the room. A reconnect clears both,
/// and only a fresh `join` acknowledged by the authority sets `joined` again.
#[derive(Clone)]
pub struct SessionChannel {
    transport: Rc<RefCell<Box<dyn SessionTransport>>>,
    connected: Rc<Cell<bool>>,
    joined: Rc<Cell<bool>>,
    closing: Rc<Cell<bool>>,
    /// Guards against callbacks from a superseded connection attempt.
    connect_seq: Rc<Cell<u64>>,
}

impl SessionChannel {
    pub fn new(transport: Box<dyn SessionTransport>) -> Self {
        Self {
            transport: Rc::new(RefCell::new(transport)),
            connected: Rc::new(Cell::new(false)),
            joined: Rc::new(Cell::new(false)),
            closing: Rc::new(Cell::new(false)),
            connect_seq: Rc::new(Cell::new(0)),
        }
    }

    pub fn connected(&self) -> bool {
        self.connected.get()
    }

    pub fn joined(&self) -> bool {
        self.joined.get()
    }

    pub fn connect(&self, url: &str, credential: &str, callbacks: ChannelCallbacks) {
        self.disconnect();
        self.closing.set(false);

        let seq = self.connect_seq.get().wrapping_add(1);
        self.connect_seq.set(seq);

        let url = url.trim();
        if url.is_empty() {
            warn!("missing channel url for connect");
            (callbacks.on_drop)();
            return;
        }

        let sink = TransportSink {
            on_open: {
                let connected = self.connected.clone();
                let connect_seq = self.connect_seq.clone();
                let on_open = callbacks.on_open.clone();
                Rc::new(move || {
                    if connect_seq.get() != seq {
                        return;
                    }
                    connected.set(true);
                    on_open();
                })
            },
            on_frame: {
                let joined = self.joined.clone();
                let connect_seq = self.connect_seq.clone();
                let on_message = callbacks.on_message.clone();
                Rc::new(move |bytes: Vec<u8>| {
                    if connect_seq.get() != seq {
                        return;
                    }
                    let Some(msg) = decode::<ServerMsg>(&bytes) else {
                        warn!("dropping undecodable frame ({} bytes)", bytes.len());
                        return;
                    };
                    // The join ack flips room membership before the owner
                    // sees the message, so handlers observe joined=true.
                    if matches!(msg, ServerMsg::Joined { .. }) {
                        joined.set(true);
                    }
                    on_message(msg);
                })
            },
            on_close: {
                let connected = self.connected.clone();
                let joined = self.joined.clone();
                let closing = self.closing.clone();
                let connect_seq = self.connect_seq.clone();
                let on_drop = callbacks.on_drop.clone();
                Rc::new(move || {
                    if connect_seq.get() != seq {
                        return;
                    }
                    connected.set(false);
                    joined.set(false);
                    if closing.get() {
                        return;
                    }
                    on_drop();
                })
            },
        };

        self.transport.borrow_mut().open(url, credential, sink);
    }

    /// Requests membership in the room. `joined` stays false until the
    /// authority acks with `ServerMsg::Joined`.
    pub fn join(&self, code: &str) {
        self.joined.set(false);
        self.send(ClientMsg::Join {
            code: code.to_string(),
        });
    }

    /// Sends when the link is up; otherwise the message is dropped, since
    /// every action is re-derivable from authoritative state after a rejoin.
    pub fn send(&self, msg: ClientMsg) {
        if !self.connected.get() {
            debug!("dropping send while disconnected");
            return;
        }
        let mut transport = self.transport.borrow_mut();
        if !transport.is_open() {
            debug!("dropping send on closed transport");
            return;
        }
        let Some(bytes) = encode(&msg) else {
            warn!("failed to encode outbound message");
            return;
        };
        transport.send(bytes);
    }

    pub fn disconnect(&self) {
        self.closing.set(true);
        self.connected.set(false);
        self.joined.set(false);
        self.transport.borrow_mut().close();
    }
}
