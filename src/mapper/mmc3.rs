use bitfield_struct::bitfield;
use bitflags::bitflags;

use crate::{banks::{Banking, MemConfig}, cart::{CartHeader, Mirroring}};
use super::Mapper;

#[bitfield(u8, order = Lsb)]
struct BankSelect {
  #[bits(3)]
  reg: u8,
  #[bits(3)]
  __: u8,
  prg_fix_first: bool,
  chr_inverted: bool,
}

bitflags! {
  #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
  #[serde(transparent)]
  struct PrgRamProtect: u8 {
    const WRITE_PROTECT = 0b0100_0000;
    const ENABLE        = 0b1000_0000;
  }
}

const BANK_REGS_POWER_ON: [u8; 8] = [0, 2, 4, 5, 6, 7, 0, 1];

/// How many ppu ticks A12 has to stay low before a rising edge clocks the irq counter.
/// Pattern fetches within a scanline leave it low for only 4 ticks.
pub const A12_LOW_FILTER: u8 = 8;

// Mapper 04
// https://www.nesdev.org/wiki/MMC3
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Mmc3 {
  bank_select: u8,
  bank_regs: [u8; 8],

  mirroring: Mirroring,
  header_mirroring: Mirroring,
  four_screen: bool,
  prg_ram_protect: PrgRamProtect,

  irq_counter: u8,
  irq_latch: u8,
  irq_reload: bool,
  irq_enabled: bool,
  irq_requested: Option<()>,

  a12_low_ticks: u8,
}

impl Mmc3 {
  fn update_banks(&self, cfg: &mut MemConfig) {
    let select = BankSelect::from_bits(self.bank_select);
    let reg = |i: usize| self.bank_regs[i] as isize;

    let (r6, r7) = (reg(6) & 0x3F, reg(7) & 0x3F);
    if select.prg_fix_first() {
      cfg.prg.set_page(0, -2);
      cfg.prg.set_page(2, r6);
    } else {
      cfg.prg.set_page(0, r6);
      cfg.prg.set_page(2, -2);
    }
    cfg.prg.set_page(1, r7);
    cfg.prg.set_page_to_last_bank(3);

    let (big, small) = if select.chr_inverted() { (4, 0) } else { (0, 4) };
    cfg.chr.set_page(big,   reg(0) & !1);
    cfg.chr.set_page(big+1, reg(0) | 1);
    cfg.chr.set_page(big+2, reg(1) & !1);
    cfg.chr.set_page(big+3, reg(1) | 1);
    for i in 0..4 {
      cfg.chr.set_page(small+i, reg(2+i));
    }
  }

  fn clock_irq_counter(&mut self) {
    if self.irq_counter == 0 || self.irq_reload {
      self.irq_counter = self.irq_latch;
      self.irq_reload = false;
    } else {
      self.irq_counter -= 1;
    }

    if self.irq_enabled && self.irq_counter == 0 {
      self.irq_requested = Some(());
    }
  }
}

#[typetag::serde]
impl Mapper for Mmc3 {
  fn new(header: &CartHeader, cfg: &mut MemConfig) -> Box<Self> {
    cfg.prg = Banking::new_prg(header, 4);
    cfg.chr = Banking::new_chr(header, 8);

    let four_screen = header.mirroring == Mirroring::FourScreen;
    let mut mapper = Self {
      bank_select: 0,
      bank_regs: BANK_REGS_POWER_ON,
      mirroring: header.mirroring,
      header_mirroring: header.mirroring,
      four_screen,
      prg_ram_protect: PrgRamProtect::ENABLE,
      irq_counter: 0, irq_latch: 0,
      irq_reload: false, irq_enabled: false,
      irq_requested: None,
      a12_low_ticks: 0,
    };
    mapper.reset(cfg);
    Box::new(mapper)
  }

  fn id(&self) -> u16 { 4 }

  fn reset(&mut self, cfg: &mut MemConfig) {
    self.bank_select = 0;
    self.bank_regs = BANK_REGS_POWER_ON;
    self.mirroring = self.header_mirroring;
    self.prg_ram_protect = PrgRamProtect::ENABLE;
    self.irq_counter = 0;
    self.irq_latch = 0;
    self.irq_reload = false;
    self.irq_enabled = false;
    self.irq_requested = None;
    self.a12_low_ticks = 0;
    self.update_banks(cfg);
  }

  fn prg_write(&mut self, cfg: &mut MemConfig, addr: usize, val: u8) {
    let addr_even = addr % 2 == 0;
    match (addr, addr_even) {
      (0x8000..=0x9FFF, true) => {
        self.bank_select = val;
        self.update_banks(cfg);
      }
      (0x8000..=0x9FFF, false) => {
        let reg = BankSelect::from_bits(self.bank_select).reg() as usize;
        self.bank_regs[reg] = val;
        self.update_banks(cfg);
      }
      (0xA000..=0xBFFF, true) => if !self.four_screen {
        self.mirroring = match val & 1 != 0 {
          false => Mirroring::Vertical,
          true  => Mirroring::Horizontal,
        };
      }
      (0xA000..=0xBFFF, false) =>
        self.prg_ram_protect = PrgRamProtect::from_bits_truncate(val),
      (0xC000..=0xDFFF, true) => self.irq_latch = val,
      (0xC000..=0xDFFF, false) => {
        self.irq_counter = 0;
        self.irq_reload = true;
      }
      (0xE000..=0xFFFF, true) => {
        self.irq_enabled = false;
        self.irq_requested = None;
      }
      (0xE000..=0xFFFF, false) => self.irq_enabled = true,
      _ => {}
    }
  }

  fn sram_read_enabled(&self) -> bool {
    self.prg_ram_protect.contains(PrgRamProtect::ENABLE)
  }

  fn sram_write_enabled(&self) -> bool {
    self.prg_ram_protect.contains(PrgRamProtect::ENABLE)
      && !self.prg_ram_protect.contains(PrgRamProtect::WRITE_PROTECT)
  }

  fn ppu_tick(&mut self, addr: u16) {
    let a12 = addr & 0x1000 != 0;
    if !a12 {
      self.a12_low_ticks = self.a12_low_ticks.saturating_add(1);
      return;
    }

    if self.a12_low_ticks >= A12_LOW_FILTER {
      self.clock_irq_counter();
    }
    self.a12_low_ticks = 0;
  }

  fn mirroring(&self) -> Option<Mirroring> {
    Some(self.mirroring)
  }

  fn poll_irq(&self) -> bool {
    self.irq_requested.is_some()
  }

  fn ack_irq(&mut self) {
    self.irq_requested = None;
  }
}
