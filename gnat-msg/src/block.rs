use core::ops::Range;

/// Three items of information may need to be transferred in a
/// Block (Block1 or Block2) option:
/// * the block-size exponent ([`Block::szx`]; block size = `2^(szx+4)`)
/// * whether more blocks are following ([`Block::more`])
/// * the relative number of the block ([`Block::num`]) within a sequence
///   of blocks with the given size.
///
/// # Related
/// - [RFC7959#section-2.2 Structure of a Block Option](https://datatracker.ietf.org/doc/html/rfc7959#section-2.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(u32);

impl Block {
  /// Compose a block option value. `szx` is masked to its 3 wire bits;
  /// valid exponents are 0 (16 bytes) through 6 (1024 bytes).
  pub fn new(num: u32, szx: u8, more: bool) -> Self {
    Self((num << 4) | (u32::from(more) << 3) | u32::from(szx & 0b111))
  }

  /// The decoded uint value of a Block1/Block2 option
  pub fn from_value(v: u32) -> Self {
    Self(v)
  }

  /// The uint value to write into a Block1/Block2 option
  pub fn value(self) -> u32 {
    self.0
  }

  /// Block-size exponent; 7 is reserved and reads as 6 (1024 bytes)
  pub fn szx(self) -> u8 {
    ((self.0 & 0b111) as u8).min(6)
  }

  /// Block size in bytes
  pub fn size(self) -> usize {
    1 << (self.szx() + 4)
  }

  /// Whether more blocks follow this one
  pub fn more(self) -> bool {
    (self.0 & 0b1000) != 0
  }

  /// Relative block number
  pub fn num(self) -> u32 {
    self.0 >> 4
  }
}

/// Computes which byte range of an overall payload belongs to a given
/// block number, and whether blocks follow it.
///
/// This is the server side of a Block2 transfer: given the block number
/// and size a client asked for and the total length of the
/// representation, the slicer yields the range to copy out and the
/// `more` flag to echo back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slicer {
  num: u32,
  szx: u8,
  total: usize,
}

impl Slicer {
  /// A slicer for block `num` at exponent `szx` of a `total`-byte payload
  pub fn new(num: u32, szx: u8, total: usize) -> Self {
    Self { num,
           szx: szx.min(6),
           total }
  }

  /// A slicer answering a requested [`Block`], clamping the exponent to
  /// `max_szx` (the server is authoritative on its maximum block size).
  ///
  /// When the request is clamped, the block number is rescaled so that
  /// the byte offset the client asked for is preserved. A block number
  /// too large to rescale saturates past the end of the payload, so the
  /// resulting [`range`](Self::range) is empty.
  pub fn from_block(b: Block, total: usize, max_szx: u8) -> Self {
    let (num, szx) = if b.szx() > max_szx {
      let scale = 1u32 << (b.szx() - max_szx);
      (b.num().saturating_mul(scale), max_szx)
    } else {
      (b.num(), b.szx())
    };
    Self::new(num, szx, total)
  }

  /// Block size in bytes
  pub fn size(&self) -> usize {
    1 << (self.szx + 4)
  }

  /// The byte range of the overall payload covered by this block.
  ///
  /// Empty when the block number is past the end of the payload.
  pub fn range(&self) -> Range<usize> {
    let start = (self.num as usize * self.size()).min(self.total);
    let end = (start + self.size()).min(self.total);
    start..end
  }

  /// Whether blocks follow this one
  pub fn more(&self) -> bool {
    self.range().end < self.total
  }

  /// The block option value describing this slice
  pub fn block(&self) -> Block {
    Block::new(self.num, self.szx, self.more())
  }
}
