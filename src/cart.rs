use std::fmt;

use log::{debug, info, trace};

use crate::{banks::MemConfig, mapper::{self, Mapper}, mem::MemRegion};

const NES_MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];
const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;
pub const PRG_ROM_PAGE_SIZE: usize = 1024 * 16;
pub const CHR_ROM_PAGE_SIZE: usize = 1024 * 8;
const DEFAULT_SRAM_SIZE: usize = 1024 * 8;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Mirroring {
  #[default] Horizontal,
  Vertical,
  SingleScreenA,
  SingleScreenB,
  FourScreen
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartError {
  BadHeader(&'static str),
  UnsupportedMapper(u16),
  BankCount { mapper: u16, name: &'static str, min: usize, max: usize, found: usize },
  SizeMismatch { region: &'static str, expected: usize, found: usize },
}

impl fmt::Display for CartError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CartError::BadHeader(e) => write!(f, "Not a valid iNES rom: {e}"),
      CartError::UnsupportedMapper(id) =>
        write!(f, "Mapper {id} not implemented, game can't be loaded correctly"),
      CartError::BankCount { mapper, name, min, max, found } =>
        write!(f, "Mapper {mapper} ({name}) needs {min} to {max} PRG banks of 16KiB, cart has {found}"),
      CartError::SizeMismatch { region, expected, found } =>
        write!(f, "{region} should be {expected} bytes, got {found}"),
    }
  }
}

impl std::error::Error for CartError {}

/// The subset of the iNES header a mapper needs to be built.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CartHeader {
  pub mapper: u16,
  pub prg_16kb_banks: usize,
  pub chr_8kb_banks: usize,
  pub uses_chr_ram: bool,
  pub chr_ram_size: usize,
  pub prg_ram_size: usize,
  pub has_battery: bool,
  pub has_trainer: bool,
  pub mirroring: Mirroring,
}

impl CartHeader {
  pub fn new(mapper: u16, prg_16kb_banks: usize, chr_8kb_banks: usize, mirroring: Mirroring, has_battery: bool) -> Self {
    let uses_chr_ram = chr_8kb_banks == 0;
    Self {
      mapper,
      prg_16kb_banks,
      chr_8kb_banks,
      uses_chr_ram,
      // iNes header doesn't hold information about chr ram size, so it defaults to 8kb if no chr rom is present
      chr_ram_size: if uses_chr_ram { CHR_ROM_PAGE_SIZE } else { 0 },
      prg_ram_size: 0,
      has_battery,
      has_trainer: false,
      mirroring,
    }
  }

  pub fn from_ines(rom: &[u8]) -> Result<Self, CartError> {
    if rom.len() < HEADER_SIZE {
      return Err(CartError::BadHeader("file too small to contain a 16 bytes header"));
    }
    if rom[0..4] != NES_MAGIC {
      return Err(CartError::BadHeader("Nintendo header magic values not found"));
    }

    let four_screen = rom[6] & 0b0000_1000 != 0;
    let mirroring = match (rom[6] & 1, four_screen) {
      (_, true)  => Mirroring::FourScreen,
      (0, false) => Mirroring::Horizontal,
      _          => Mirroring::Vertical,
    };
    let has_battery = rom[6] & 0b0000_0010 != 0;

    let mapper_low = rom[6] >> 4;
    let mapper_high = rom[7] & 0b1111_0000;
    let mapper = (mapper_high | mapper_low) as u16;

    let mut header = CartHeader::new(mapper, rom[4] as usize, rom[5] as usize, mirroring, has_battery);
    header.has_trainer = rom[6] & 0b0000_0100 != 0;
    // This field was a later addition to iNes, so most games do not use it, even if they contain prg_ram.
    // If it is 0, prg ram is inferred as 8kb.
    header.prg_ram_size = rom[8] as usize * 8 * 1024;
    Ok(header)
  }

  pub fn prg_size(&self) -> usize {
    self.prg_16kb_banks * PRG_ROM_PAGE_SIZE
  }

  pub fn chr_size(&self) -> usize {
    self.chr_8kb_banks * CHR_ROM_PAGE_SIZE
  }

  pub fn chr_real_size(&self) -> usize {
    if self.uses_chr_ram { self.chr_ram_size } else { self.chr_size() }
  }

  pub fn sram_real_size(&self) -> usize {
    if self.prg_ram_size > 0 { self.prg_ram_size } else { DEFAULT_SRAM_SIZE }
  }
}

#[derive(serde::Serialize)]
struct SnapshotRef<'a> {
  mapper_id: u16,
  cfg: &'a MemConfig,
  sram: &'a MemRegion,
  chr_ram: Option<&'a MemRegion>,
  mapper: &'a (dyn Mapper + 'static),
}

#[derive(serde::Deserialize)]
struct Snapshot {
  mapper_id: u16,
  cfg: MemConfig,
  sram: MemRegion,
  chr_ram: Option<MemRegion>,
  mapper: Box<dyn Mapper>,
}

/// A loaded cartridge: the memory chips, their bank windows and the mapper driving them.
/// This is the only surface the cpu and ppu see.
pub struct Cart {
  pub header: CartHeader,
  prg: MemRegion,
  chr: MemRegion,
  sram: MemRegion,
  cfg: MemConfig,
  mapper: Box<dyn Mapper>,
}

impl Cart {
  pub fn new(rom: &[u8]) -> Result<Self, CartError> {
    let header = CartHeader::from_ines(rom)?;

    let prg_start = HEADER_SIZE + if header.has_trainer { TRAINER_SIZE } else { 0 };
    let chr_start = prg_start + header.prg_size();
    let chr_end = chr_start + if header.uses_chr_ram { 0 } else { header.chr_size() };
    if rom.len() < chr_end {
      return Err(CartError::SizeMismatch { region: "rom file", expected: chr_end, found: rom.len() });
    }

    let prg = rom[prg_start..chr_start].to_vec();
    let chr = rom[chr_start..chr_end].to_vec();
    Self::with_header(header, prg, chr)
  }

  /// Builds the cart from already split memory. `chr` must be empty when the header declares chr ram.
  pub fn with_header(header: CartHeader, prg: Vec<u8>, chr: Vec<u8>) -> Result<Self, CartError> {
    if prg.len() != header.prg_size() {
      return Err(CartError::SizeMismatch { region: "PRG-ROM", expected: header.prg_size(), found: prg.len() });
    }
    if chr.len() != header.chr_size() {
      return Err(CartError::SizeMismatch { region: "CHR-ROM", expected: header.chr_size(), found: chr.len() });
    }

    let prg = MemRegion::rom(prg);
    let chr = if header.uses_chr_ram {
      MemRegion::ram(header.chr_ram_size)
    } else {
      MemRegion::rom(chr)
    };
    let sram = MemRegion::ram(header.sram_real_size());

    let mut cfg = MemConfig::new(&header);
    let mapper = mapper::new_mapper(&header, &mut cfg)?;

    info!(
      "Loaded cart: mapper {} ({}), PRG {}KiB, CHR {} {}KiB, SRAM {}KiB{}",
      header.mapper, mapper::mapper_name(header.mapper),
      prg.len() / 1024,
      if header.uses_chr_ram { "RAM" } else { "ROM" }, chr.len() / 1024,
      sram.len() / 1024,
      if header.has_battery { " (battery)" } else { "" },
    );

    Ok(Self { header, prg, chr, sram, cfg, mapper })
  }

  pub fn mapper_name(&self) -> &'static str {
    mapper::mapper_name(self.header.mapper)
  }

  pub fn reset(&mut self) {
    self.mapper.reset(&mut self.cfg);
  }

  pub fn cpu_read(&mut self, addr: u16) -> u8 {
    let addr = addr as usize;
    match addr {
      0x4020..=0x5FFF => self.mapper.cart_read(addr),
      0x6000..=0x7FFF if self.mapper.sram_read_enabled() =>
        self.sram.read(self.cfg.sram.translate(addr)),
      // open bus, approximated with the address high byte
      0x6000..=0x7FFF => (addr >> 8) as u8,
      0x8000..=0xFFFF => self.prg.read(self.cfg.prg.translate(addr)),
      _ => { debug!("Cart read to ${addr:04X} not mapped"); 0 }
    }
  }

  pub fn cpu_write(&mut self, addr: u16, val: u8) {
    let addr = addr as usize;
    match addr {
      0x4020..=0x5FFF => self.mapper.cart_write(&mut self.cfg, addr, val),
      0x6000..=0x7FFF if self.mapper.sram_write_enabled() => {
        let offset = self.cfg.sram.translate(addr);
        self.sram.write(offset, val);
      }
      0x6000..=0x7FFF => trace!("SRAM write to ${addr:04X} while protected"),
      0x8000..=0xFFFF => self.mapper.prg_write(&mut self.cfg, addr, val),
      _ => debug!("Cart write to ${addr:04X} not mapped"),
    }
  }

  pub fn ppu_read(&mut self, addr: u16) -> u8 {
    let offset = self.cfg.chr.translate(addr as usize & 0x1FFF);
    self.chr.read(offset)
  }

  pub fn ppu_write(&mut self, addr: u16, val: u8) {
    if !self.chr.is_writable() {
      trace!("CHR-ROM write to ${addr:04X} ignored");
      return;
    }
    let offset = self.cfg.chr.translate(addr as usize & 0x1FFF);
    self.chr.write(offset, val);
  }

  /// Called once per ppu cycle with the current ppu address bus value.
  pub fn ppu_tick(&mut self, addr: u16) {
    self.mapper.ppu_tick(addr);
  }

  pub fn mirroring(&self) -> Mirroring {
    self.mapper.mirroring().unwrap_or(self.header.mirroring)
  }

  pub fn irq_pending(&self) -> bool {
    self.mapper.poll_irq()
  }

  pub fn ack_irq(&mut self) {
    self.mapper.ack_irq();
  }

  pub fn get_sram(&self) -> Option<Vec<u8>> {
    if self.header.has_battery {
      Some(self.sram.as_slice().to_vec())
    } else { None }
  }

  pub fn set_sram(&mut self, data: &[u8]) {
    self.sram.load(data);
  }

  pub fn save_state(&self) -> anyhow::Result<Vec<u8>> {
    let snapshot = SnapshotRef {
      mapper_id: self.header.mapper,
      cfg: &self.cfg,
      sram: &self.sram,
      // we only save chr if it is chr ram, rom never changes
      chr_ram: self.chr.is_writable().then_some(&self.chr),
      mapper: self.mapper.as_ref(),
    };
    Ok(pot::to_vec(&snapshot)?)
  }

  pub fn restore_state(&mut self, blob: &[u8]) -> anyhow::Result<()> {
    let snapshot: Snapshot = pot::from_slice(blob)?;

    anyhow::ensure!(
      snapshot.mapper_id == self.header.mapper,
      "savestate is for mapper {}, cart uses mapper {}", snapshot.mapper_id, self.header.mapper
    );
    anyhow::ensure!(
      snapshot.mapper.id() == self.header.mapper,
      "savestate holds a mapper {} state, cart uses mapper {}", snapshot.mapper.id(), self.header.mapper
    );
    anyhow::ensure!(
      snapshot.sram.len() == self.sram.len(),
      "savestate SRAM is {} bytes, cart has {}", snapshot.sram.len(), self.sram.len()
    );
    anyhow::ensure!(
      snapshot.cfg.prg.same_layout(&self.cfg.prg)
        && snapshot.cfg.chr.same_layout(&self.cfg.chr)
        && snapshot.cfg.sram.same_layout(&self.cfg.sram),
      "savestate PRG/CHR/SRAM bank layout (sizes, page size, page count) does not match the cart"
    );
    match (&snapshot.chr_ram, self.chr.is_writable()) {
      (Some(chr), true) => anyhow::ensure!(
        chr.len() == self.chr.len(),
        "savestate CHR-RAM is {} bytes, cart has {}", chr.len(), self.chr.len()
      ),
      (None, false) => {}
      _ => anyhow::bail!("savestate CHR kind does not match the cart"),
    }

    self.cfg = snapshot.cfg;
    self.sram = snapshot.sram;
    if let Some(chr) = snapshot.chr_ram {
      self.chr = chr;
    }
    self.mapper = snapshot.mapper;

    debug!("Restored savestate for mapper {}", self.header.mapper);
    Ok(())
  }
}
