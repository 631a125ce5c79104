/// From [RFC 2449](https://tools.ietf.org/html/rfc2449).
///
/// The subset of the server's `CAPA` response the engine acts upon.
///
/// - `PIPELINING` means the server accepts several commands before answering any, and answers
///   them in order. The engine then sends whole batches in one write.
/// - `UIDL` means the server supports the `UIDL` command.
/// - `TOP` means the server supports `TOP msg n`, used to fetch headers without the body.
///
/// Clients MUST ignore capabilities they do not recognize, and so does [`Capabilities::parse`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The server advertised `PIPELINING`.
    pub pipelining: bool,
    /// The server advertised `UIDL`.
    pub uidl: bool,
    /// The server advertised `TOP`.
    pub top: bool,
}

impl Capabilities {
    /// Build from the lines of a `CAPA` response.
    pub fn parse<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut caps = Capabilities::default();
        for line in lines {
            match line.as_ref().trim() {
                "PIPELINING" => caps.pipelining = true,
                "UIDL" => caps.uidl = true,
                "TOP" => caps.top = true,
                _ => {}
            }
        }
        caps
    }
}
