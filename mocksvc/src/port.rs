use std::io;
use std::net::TcpListener;
use std::sync::{Arc, Mutex, PoisonError};

/// Throwaway listener holding an OS-assigned port until the worker is about
/// to bind it.
#[derive(Debug)]
pub struct PortReservation {
    _listener: TcpListener,
    port: u16,
}

impl PortReservation {
    pub fn reserve(host: &str) -> io::Result<Self> {
        let listener = TcpListener::bind((host, 0))?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            _listener: listener,
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Reservation shared by an instance and its worker. Either side may close
/// it; closing twice is a no-op.
#[derive(Debug, Clone, Default)]
pub struct ReservationSlot(Arc<Mutex<Option<PortReservation>>>);

impl ReservationSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn holding(reservation: PortReservation) -> Self {
        Self(Arc::new(Mutex::new(Some(reservation))))
    }

    pub fn is_held(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Close the reservation socket. Returns whether one was still held.
    pub fn release(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }
}

/// Where the port of a new instance comes from.
#[derive(Debug)]
pub enum PortSource {
    Fixed(u16),
    Reserved(PortReservation),
}

impl PortSource {
    /// The fixed port when given, else a freshly reserved ephemeral one.
    /// A fixed port of 0 counts as not given.
    pub fn allocate(host: &str, fixed: Option<u16>) -> io::Result<Self> {
        match fixed.filter(|p| *p != 0) {
            Some(port) => Ok(Self::Fixed(port)),
            None => PortReservation::reserve(host).map(Self::Reserved),
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Self::Fixed(port) => *port,
            Self::Reserved(reservation) => reservation.port(),
        }
    }

    pub fn into_slot(self) -> ReservationSlot {
        match self {
            Self::Fixed(_) => ReservationSlot::empty(),
            Self::Reserved(reservation) => {
                ReservationSlot::holding(reservation)
            }
        }
    }
}
