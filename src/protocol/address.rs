//! Module `address`
//!
//! The six-octet `h1,h2,h3,h4,p1,p2` host/port tuple used by PORT and PASV.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Failures while decoding a PASV reply or encoding a PORT argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    MissingParenthesis,
    /// Field `index` (0-based) is empty, too long, non-numeric or badly terminated.
    BadField(usize),
    /// Field `index` is numeric but above 255.
    OutOfRange(usize, u16),
    NotIpv4(SocketAddr),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::MissingParenthesis => write!(f, "no '(' in passive reply"),
            AddressError::BadField(i) => write!(f, "malformed address field {}", i + 1),
            AddressError::OutOfRange(i, v) => {
                write!(f, "address field {} out of range: {}", i + 1, v)
            }
            AddressError::NotIpv4(addr) => write!(f, "{addr} is not an IPv4 address"),
        }
    }
}

impl std::error::Error for AddressError {}

/// An IPv4 address and port as carried on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressTuple {
    ip: Ipv4Addr,
    port: u16,
}

impl AddressTuple {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn from_socket_addr(addr: SocketAddr) -> Result<Self, AddressError> {
        match addr {
            SocketAddr::V4(v4) => Ok(Self::new(*v4.ip(), v4.port())),
            SocketAddr::V6(_) => Err(AddressError::NotIpv4(addr)),
        }
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }

    /// Decodes the tuple from a 227 reply text.
    ///
    /// Scans to the first `(`, then expects five comma-terminated fields and a
    /// sixth terminated by `)`. Each field is one to three digits.
    pub fn parse_pasv(text: &str) -> Result<Self, AddressError> {
        let start = text.find('(').ok_or(AddressError::MissingParenthesis)?;
        let bytes = &text.as_bytes()[start + 1..];
        let mut pos = 0;
        let mut octets = [0u8; 6];

        for (index, slot) in octets.iter_mut().enumerate() {
            let end = if index == 5 { b')' } else { b',' };
            *slot = take_octet(bytes, &mut pos, end, index)?;
        }

        Ok(Self::new(
            Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]),
            u16::from_be_bytes([octets[4], octets[5]]),
        ))
    }

    /// Renders the PORT argument.
    pub fn encode(&self) -> String {
        let [h1, h2, h3, h4] = self.ip.octets();
        let [p1, p2] = self.port.to_be_bytes();
        format!("{h1},{h2},{h3},{h4},{p1},{p2}")
    }
}

impl fmt::Display for AddressTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn take_octet(bytes: &[u8], pos: &mut usize, end: u8, index: usize) -> Result<u8, AddressError> {
    let start = *pos;
    while *pos < bytes.len() && *pos - start < 3 && bytes[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == start || bytes.get(*pos) != Some(&end) {
        return Err(AddressError::BadField(index));
    }
    let value = bytes[start..*pos]
        .iter()
        .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'));
    *pos += 1;
    u8::try_from(value).map_err(|_| AddressError::OutOfRange(index, value))
}
