//! The readiness event loop.
//!
//! A single thread polls the listener and every connection socket with a
//! bounded timeout and is the sole mutator of game state. Connections live
//! in an arena keyed by [`Token`]; the White and Black seats hold tokens,
//! never references, and all routing compares tokens.

use std::collections::HashMap;
use std::fmt::Display;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use skakbord_core::board::Color;
use skakbord_core::game::{Game, Score};

use crate::connection::{
    self, Connection, HandshakeError, Role, HANDSHAKE_TIMEOUT,
};
use crate::protocol::{self, ClientCommand};

const LISTENER: Token = Token(0);
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Where the session is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for both colors to be claimed. Player sockets are read only
    /// to notice disconnects.
    Lobby,
    /// The game is running; only the socket of the side to move is read.
    Playing,
    /// The game ended; send buffers are drained and connections closed.
    Post,
}

/// A server hosting one game of chess for two players and any number of
/// spectators.
pub struct Server {
    listener: TcpListener,
    poll: Poll,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    white: Option<Token>,
    black: Option<Token>,
    game: Game,
    phase: Phase,
}

impl Server {
    /// Binds the listener and sets up the poll registry. The game must
    /// already be constructed; an invalid starting position never gets this
    /// far.
    pub fn bind(addr: SocketAddr, game: Game) -> io::Result<Self> {
        let mut listener = TcpListener::bind(addr)?;
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        Ok(Self {
            listener,
            poll,
            connections: HashMap::new(),
            next_token: 1,
            white: None,
            black: None,
            game,
            phase: Phase::Lobby,
        })
    }

    /// The address the listener actually bound, useful with port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the event loop until the game has ended and every connection is
    /// drained and closed. On a fatal error the last known score is pushed
    /// to the survivors before returning.
    pub fn run(&mut self) -> io::Result<()> {
        let result = self.serve();
        if let Err(err) = &result {
            warn!("fatal server error: {err}");
        }
        self.shutdown();
        result
    }

    fn serve(&mut self) -> io::Result<()> {
        let mut events = Events::with_capacity(128);

        loop {
            match self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_clients(),
                    token => {
                        if event.is_writable() {
                            self.flush_connection(token);
                        }
                        if event.is_readable() {
                            self.handle_readable(token);
                        }
                    }
                }
            }

            if self.phase == Phase::Lobby && self.white.is_some() && self.black.is_some() {
                self.start_game();
            }

            if self.phase == Phase::Post && self.sweep_post() {
                return Ok(());
            }
        }
    }

    fn accept_clients(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    info!("connection established: {peer}");
                    self.admit(stream, peer);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!("accept failed: {err}");
                    break;
                }
            }
        }
    }

    fn admit(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        if self.phase != Phase::Lobby {
            // Late arrivals become spectators without being asked: push the
            // role code, the position and the confirmation in one go.
            let mut conn = Connection::new(stream, peer, Role::Spectator);
            conn.queue("s");
            conn.queue(&self.game.fen());
            conn.queue("initok");
            if let Some(token) = self.install(conn) {
                info!("{peer} joined as spectator");
                self.flush_connection(token);
            }
            return;
        }

        let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
        match self.negotiate(&mut stream, deadline) {
            Ok(role) => {
                let conn = Connection::new(stream, peer, role);
                let Some(token) = self.install(conn) else {
                    return;
                };
                match role {
                    Role::White => self.white = Some(token),
                    Role::Black => self.black = Some(token),
                    Role::Spectator => {}
                }
                info!("{peer} joined as {role}");
            }
            Err(err) => {
                warn!("failed to initialize connection from {peer}: {err}");
                let goodbye = Instant::now() + HANDSHAKE_TIMEOUT;
                let _ = connection::write_frame_blocking(&mut stream, "initfail", goodbye);
            }
        }
    }

    /// The lobby handshake: offer the open roles, read the client's choice,
    /// then confirm with the position. Runs synchronously on the fresh
    /// socket; this is the only place the loop blocks, and only briefly.
    fn negotiate(
        &mut self,
        stream: &mut TcpStream,
        deadline: Instant,
    ) -> Result<Role, HandshakeError> {
        let mut offer = String::new();
        if self.white.is_none() {
            offer.push('w');
        }
        if self.black.is_none() {
            offer.push('b');
        }
        offer.push('s');
        connection::write_frame_blocking(stream, &offer, deadline)?;

        let choice = connection::read_frame_blocking(stream, deadline)?;
        let role = match choice.as_str() {
            "w" if self.white.is_none() => Role::White,
            "b" if self.black.is_none() => Role::Black,
            "s" => Role::Spectator,
            _ => return Err(HandshakeError::BadChoice(choice)),
        };

        connection::write_frame_blocking(stream, &self.game.fen(), deadline)?;
        connection::write_frame_blocking(stream, "initok", deadline)?;
        Ok(role)
    }

    fn install(&mut self, mut conn: Connection) -> Option<Token> {
        let token = Token(self.next_token);
        self.next_token += 1;

        if let Err(err) = self.poll.registry().register(
            conn.stream_mut(),
            token,
            Interest::READABLE | Interest::WRITABLE,
        ) {
            warn!("failed to register {}: {err}", conn.peer());
            return None;
        }

        self.connections.insert(token, conn);
        Some(token)
    }

    fn start_game(&mut self) {
        self.phase = Phase::Playing;
        info!(
            "both colors taken; {} to move",
            color_name(self.game.to_move())
        );
        // Anything the first player sent ahead of time is waiting in its
        // socket buffer; readiness already fired for it.
        self.pump_current_player();
    }

    fn current_player(&self) -> Option<Token> {
        match self.game.to_move() {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    fn handle_readable(&mut self, token: Token) {
        match self.phase {
            Phase::Lobby => {
                if Some(token) == self.white || Some(token) == self.black {
                    self.drain_lobby(token);
                }
            }
            Phase::Playing => {
                if Some(token) == self.current_player() {
                    self.pump_current_player();
                }
            }
            Phase::Post => {}
        }
    }

    /// Lobby players are read to detect disconnects; complete frames that
    /// arrive before the game starts are discarded.
    fn drain_lobby(&mut self, token: Token) {
        loop {
            let result = match self.connections.get_mut(&token) {
                Some(conn) => conn.read_frame(),
                None => return,
            };
            match result {
                Ok(Some(early)) => {
                    debug!("discarding message sent before the game started: {early:?}")
                }
                Ok(None) => return,
                Err(err) => {
                    self.drop_connection(token, err);
                    return;
                }
            }
        }
    }

    /// Processes every complete frame the side to move has sent. When an
    /// accepted move passes the turn, the loop continues with the other
    /// player, which also picks up input that arrived while it was idle.
    fn pump_current_player(&mut self) {
        while self.phase == Phase::Playing {
            let Some(token) = self.current_player() else {
                return;
            };
            let result = match self.connections.get_mut(&token) {
                Some(conn) => conn.read_frame(),
                None => return,
            };
            match result {
                Ok(Some(payload)) => self.dispatch(token, payload),
                Ok(None) => return,
                Err(err) => {
                    self.drop_connection(token, err);
                    return;
                }
            }
        }
    }

    fn dispatch(&mut self, token: Token, payload: String) {
        debug_assert_eq!(Some(token), self.current_player());
        info!("{}: {payload}", color_name(self.game.to_move()));

        match protocol::parse_command(&payload) {
            None => {
                debug!("no");
                self.queue_to(token, "no");
            }
            Some(ClientCommand::Moves(square)) => {
                let reply = protocol::moves_reply(square, self.game.legal_destinations(square));
                debug!("{reply}");
                self.queue_to(token, &reply);
            }
            Some(ClientCommand::Move {
                from,
                to,
                promotion,
            }) => match self.game.try_move(from, to, promotion) {
                Err(err) => {
                    debug!("no ({err})");
                    self.queue_to(token, "no");
                }
                Ok(outcome) => {
                    let mut reply = String::from("ok");
                    let mut relay = payload;
                    if let Some(mark) = outcome.annotation() {
                        reply.push(mark);
                        relay.push(mark);
                    }
                    self.queue_to(token, &reply);
                    self.broadcast(Some(token), &relay);
                    if outcome.is_terminal() {
                        self.finish_game();
                    }
                }
            },
        }

        self.flush_all();
    }

    /// Announces the result to everyone and moves to the drain phase.
    fn finish_game(&mut self) {
        self.phase = Phase::Post;
        let score = self.game.score();
        info!("game over: {score}");
        self.broadcast(None, &format!("end {score}"));
        self.flush_all();
    }

    fn queue_to(&mut self, token: Token, payload: &str) {
        if let Some(conn) = self.connections.get_mut(&token) {
            conn.queue(payload);
        }
    }

    fn broadcast(&mut self, except: Option<Token>, payload: &str) {
        for (&token, conn) in self.connections.iter_mut() {
            if Some(token) != except {
                conn.queue(payload);
            }
        }
    }

    fn flush_connection(&mut self, token: Token) {
        if let Some(conn) = self.connections.get_mut(&token) {
            if let Err(err) = conn.flush() {
                self.drop_connection(token, err);
            }
        }
    }

    fn flush_all(&mut self) {
        let mut dead = Vec::new();
        for (&token, conn) in self.connections.iter_mut() {
            if let Err(err) = conn.flush() {
                dead.push((token, err));
            }
        }
        for (token, err) in dead {
            self.drop_connection(token, err);
        }
    }

    /// Removes a connection whose socket failed or misbehaved. A player
    /// vanishing mid-game scores the game for the opponent.
    fn drop_connection(&mut self, token: Token, reason: impl Display) {
        let Some(mut conn) = self.connections.remove(&token) else {
            return;
        };
        let _ = self.poll.registry().deregister(conn.stream_mut());

        if Some(token) == self.white {
            self.white = None;
        }
        if Some(token) == self.black {
            self.black = None;
        }

        match conn.role {
            Role::Spectator => info!("spectator {} left ({reason})", conn.peer()),
            role => match self.phase {
                Phase::Lobby => info!("{role} left the lobby ({reason})"),
                Phase::Playing => {
                    warn!("{role} abandoned the game ({reason})");
                    let loser = match role {
                        Role::White => Color::White,
                        _ => Color::Black,
                    };
                    self.game.conclude(Score::loss_for(loser));
                    self.finish_game();
                }
                Phase::Post => info!("closing connection to {}", conn.peer()),
            },
        }
    }

    /// One drain pass over the surviving connections: flush, then close any
    /// whose queue has emptied. Returns true when none remain.
    fn sweep_post(&mut self) -> bool {
        let mut dead = Vec::new();
        let mut drained = Vec::new();
        for (&token, conn) in self.connections.iter_mut() {
            match conn.flush() {
                Err(err) => dead.push((token, err)),
                Ok(()) => {
                    if conn.queue_empty() {
                        drained.push(token);
                    }
                }
            }
        }
        for (token, err) in dead {
            self.drop_connection(token, err);
        }
        for token in drained {
            if let Some(mut conn) = self.connections.remove(&token) {
                let _ = self.poll.registry().deregister(conn.stream_mut());
                info!("closing connection to {}", conn.peer());
            }
        }

        self.connections.is_empty()
    }

    /// Best-effort teardown: make sure everyone has been told the result,
    /// give the sockets a moment to drain, then close them.
    fn shutdown(&mut self) {
        if self.connections.is_empty() {
            return;
        }

        info!("shutting down");
        let notice = format!("end {}", self.game.score());
        let deadline = Instant::now() + Duration::from_millis(500);
        for conn in self.connections.values_mut() {
            conn.queue(&notice);
            if let Err(err) = conn.flush_until(deadline) {
                debug!("could not deliver the result to {}: {err}", conn.peer());
            }
            info!("closing connection to {}", conn.peer());
        }
        self.connections.clear();
    }
}

const fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}
