/// Request method / response status
///
/// 8 bits split into a 3-bit class and 5-bit detail,
/// conventionally written `c.dd` (e.g. `2.05` Content).
///
/// # Related
/// - [RFC7252#section-5.9 Response Code Definitions](https://datatracker.ietf.org/doc/html/rfc7252#section-5.9)
/// - [RFC7252#section-12.1 CoAP Code Registries](https://datatracker.ietf.org/doc/html/rfc7252#section-12.1)
#[derive(Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Code {
  /// The class of the code (the `2` in `2.05`)
  pub class: u8,
  /// The detail of the code (the `05` in `2.05`)
  pub detail: u8,
}

impl Code {
  /// Create a new Code
  ///
  /// ```
  /// use gnat_msg::Code;
  ///
  /// let content = Code::new(2, 05);
  /// ```
  pub const fn new(class: u8, detail: u8) -> Self {
    Self { class, detail }
  }

  /// Parse the raw wire byte
  pub const fn from_u8(b: u8) -> Self {
    Self { class: b >> 5,
           detail: b & 0b11111 }
  }

  /// The raw wire byte
  pub const fn into_u8(self) -> u8 {
    (self.class << 5) | self.detail
  }

  /// Whether this code is for a request, response, or empty message
  pub fn kind(&self) -> CodeKind {
    match (self.class, self.detail) {
      | (0, 0) => CodeKind::Empty,
      | (0, _) => CodeKind::Request,
      | _ => CodeKind::Response,
    }
  }
}

/// Classification of a [`Code`] as request, response, or empty
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum CodeKind {
  /// A request method (0.01-0.31)
  Request,
  /// A response status (2.xx, 4.xx, 5.xx)
  Response,
  /// 0.00; used for pings and empty Acks
  Empty,
}

macro_rules! code {
  (#[doc = $doc:literal] $name:ident = $c:literal . $d:literal) => {
    #[doc = $doc]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: Code = Code::new($c, $d);
  };
}

code!(#[doc = "0.00; not a request nor a response"]        EMPTY  = 0 . 00);
code!(#[doc = "0.01 GET"]                                  GET    = 0 . 01);
code!(#[doc = "0.02 POST"]                                 POST   = 0 . 02);
code!(#[doc = "0.03 PUT"]                                  PUT    = 0 . 03);
code!(#[doc = "0.04 DELETE"]                               DELETE = 0 . 04);

code!(#[doc = "2.01 Created"]                              CREATED = 2 . 01);
code!(#[doc = "2.02 Deleted"]                              DELETED = 2 . 02);
code!(#[doc = "2.03 Valid"]                                VALID   = 2 . 03);
code!(#[doc = "2.04 Changed"]                              CHANGED = 2 . 04);
code!(#[doc = "2.05 Content"]                              CONTENT = 2 . 05);
code!(#[doc = "2.31 Continue (RFC7959); this block was accepted, send the next one"]
      CONTINUE = 2 . 31);

code!(#[doc = "4.00 Bad Request"]                          BAD_REQUEST                = 4 . 00);
code!(#[doc = "4.02 Bad Option"]                           BAD_OPTION                 = 4 . 02);
code!(#[doc = "4.04 Not Found"]                            NOT_FOUND                  = 4 . 04);
code!(#[doc = "4.05 Method Not Allowed"]                   METHOD_NOT_ALLOWED         = 4 . 05);
code!(#[doc = "4.08 Request Entity Incomplete (RFC7959); the server lost track of a Block1 transfer"]
      REQUEST_ENTITY_INCOMPLETE = 4 . 08);
code!(#[doc = "4.13 Request Entity Too Large"]             REQUEST_ENTITY_TOO_LARGE   = 4 . 13);

code!(#[doc = "5.00 Internal Server Error"]                INTERNAL_SERVER_ERROR      = 5 . 00);
