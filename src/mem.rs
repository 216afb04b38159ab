/// A raw byte store backing one cartridge chip (PRG-ROM, CHR-ROM/RAM, SRAM).
/// Bank layout is not known here; that is the job of `Banking`.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MemRegion {
  bytes: Box<[u8]>,
  writable: bool,
}

impl MemRegion {
  pub fn rom(bytes: Vec<u8>) -> Self {
    Self { bytes: bytes.into_boxed_slice(), writable: false }
  }

  pub fn ram(size: usize) -> Self {
    Self { bytes: vec![0; size].into_boxed_slice(), writable: true }
  }

  pub fn len(&self) -> usize { self.bytes.len() }
  pub fn is_empty(&self) -> bool { self.bytes.is_empty() }
  pub fn is_writable(&self) -> bool { self.writable }
  pub fn as_slice(&self) -> &[u8] { &self.bytes }

  pub fn banks_count(&self, bank_size: usize) -> usize {
    self.bytes.len() / bank_size
  }

  // regions smaller than their bank window are mirrored
  pub fn read(&self, offset: usize) -> u8 {
    if self.bytes.is_empty() { return 0; }
    self.bytes[offset % self.bytes.len()]
  }

  pub fn write(&mut self, offset: usize, val: u8) {
    if !self.writable || self.bytes.is_empty() { return; }
    let len = self.bytes.len();
    self.bytes[offset % len] = val;
  }

  /// Overwrites the region contents, e.g. with a battery save. Extra bytes are dropped.
  pub fn load(&mut self, data: &[u8]) {
    let len = data.len().min(self.bytes.len());
    self.bytes[..len].copy_from_slice(&data[..len]);
  }
}
