use std::marker::PhantomData;

use crate::cart::CartHeader;

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct PrgBanking;
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChrBanking;
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct SramBanking;

/// A row of equally sized pages covering one address range, each page pointing to a
/// physical bank of the underlying region.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Banking<T> {
  pub data_size: usize,
  pub bank_size: usize,
  pub banks_count: usize,

  bank_size_shift: usize,
  pages_start: usize,
  bankings: Box<[usize]>,
  #[serde(skip)]
  kind: PhantomData<T>,
}

impl<T> Banking<T> {
  /// `page_size` must be a power of two.
  pub fn new(data_size: usize, pages_start: usize, page_size: usize, pages_count: usize) -> Self {
    let bankings = vec![0; pages_count].into_boxed_slice();
    let bank_size = page_size;
    // a region smaller than a page still counts as one (mirrored) bank
    let banks_count = (data_size / bank_size).max(1);
    let bank_size_shift = bank_size.checked_ilog2().unwrap_or_default() as usize;
    Self { bankings, data_size, pages_start, bank_size, bank_size_shift, banks_count, kind: PhantomData }
  }

  /// Negative banks count from the last one (-1 is the last bank),
  /// anything out of range wraps around the real banks count.
  pub fn resolve_bank(&self, bank: isize) -> usize {
    let count = self.banks_count as isize;
    let bank = if bank < 0 { count + bank } else { bank };
    bank.rem_euclid(count) as usize
  }

  pub fn set_page(&mut self, page: usize, bank: isize) {
    let bank = self.resolve_bank(bank);
    self.bankings[page] = bank * self.bank_size;
  }

  pub fn set_page_to_last_bank(&mut self, page: usize) {
    self.set_page(page, -1);
  }

  /// The physical bank currently selected by `page`.
  pub fn bank(&self, page: usize) -> usize {
    self.bankings[page] / self.bank_size
  }

  /// Same region size and page geometry, whatever the selected banks are.
  pub fn same_layout(&self, other: &Self) -> bool {
    self.data_size == other.data_size
      && self.bank_size == other.bank_size
      && self.banks_count == other.banks_count
      && self.bank_size_shift == other.bank_size_shift
      && self.pages_start == other.pages_start
      && self.bankings.len() == other.bankings.len()
  }

  pub fn page_to_bank_addr(&self, page: usize, addr: usize) -> usize {
    self.bankings[page] + (addr & (self.bank_size-1))
  }

  pub fn translate(&self, addr: usize) -> usize {
    let page = (addr - self.pages_start) >> self.bank_size_shift;
    self.page_to_bank_addr(page, addr)
  }
}

impl Banking<PrgBanking> {
  pub fn new_prg(header: &CartHeader, pages_count: usize) -> Self {
    let pages_size = 32*1024 / pages_count;
    Self::new(header.prg_size(), 0x8000, pages_size, pages_count)
  }
}

impl Banking<SramBanking> {
  pub fn new_sram(header: &CartHeader) -> Self {
    Self::new(header.sram_real_size(), 0x6000, 8*1024, 1)
  }
}

impl Banking<ChrBanking> {
  pub fn new_chr(header: &CartHeader, pages_count: usize) -> Self {
    let pages_size = 8*1024 / pages_count;
    Self::new(header.chr_real_size(), 0, pages_size, pages_count)
  }
}

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct MemConfig {
  pub prg:  Banking<PrgBanking>,
  pub chr:  Banking<ChrBanking>,
  pub sram: Banking<SramBanking>,
}

impl MemConfig {
  pub fn new(header: &CartHeader) -> Self {
    let prg = Banking::new_prg(header, 1);
    let chr = Banking::new_chr(header, 1);
    let sram = Banking::new_sram(header);
    Self { prg, chr, sram }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn prg_16kb(banks: usize) -> Banking<PrgBanking> {
    Banking::new(banks * 16*1024, 0x8000, 16*1024, 2)
  }

  #[test]
  fn positive_banks_wrap() {
    for n in 1..=9 {
      let banking = prg_16kb(n);
      for b in 0..40isize {
        assert_eq!(banking.resolve_bank(b), banking.resolve_bank(b % n as isize));
      }
    }
  }

  #[test]
  fn negative_banks_count_from_end() {
    for n in 2..=9usize {
      let banking = prg_16kb(n);
      assert_eq!(banking.resolve_bank(-1), n-1);
      assert_eq!(banking.resolve_bank(-2), n-2);
    }
  }

  #[test]
  fn negative_banks_beyond_count_wrap() {
    let banking = prg_16kb(4);
    assert_eq!(banking.resolve_bank(-5), 3);
    assert_eq!(banking.resolve_bank(-8), 0);
    assert_eq!(banking.resolve_bank(-9), 3);
  }

  #[test]
  fn translate_picks_page_and_offset() {
    let mut banking = prg_16kb(4);
    banking.set_page(0, 2);
    banking.set_page_to_last_bank(1);

    assert_eq!(banking.translate(0x8000), 2 * 0x4000);
    assert_eq!(banking.translate(0x8123), 2 * 0x4000 + 0x123);
    assert_eq!(banking.translate(0xC000), 3 * 0x4000);
    assert_eq!(banking.translate(0xFFFF), 4 * 0x4000 - 1);
    assert_eq!(banking.bank(0), 2);
    assert_eq!(banking.bank(1), 3);
  }

  #[test]
  fn layout_ignores_selected_banks() {
    let mut a = prg_16kb(4);
    let b = prg_16kb(4);
    a.set_page(0, 3);
    assert!(a.same_layout(&b));

    assert!(!a.same_layout(&prg_16kb(8)));
    let four_pages: Banking<PrgBanking> = Banking::new(4 * 16*1024, 0x8000, 8*1024, 4);
    assert!(!a.same_layout(&four_pages));
  }

  #[test]
  fn tiny_region_is_one_bank() {
    let mut chr: Banking<ChrBanking> = Banking::new(2*1024, 0, 4*1024, 2);
    assert_eq!(chr.banks_count, 1);
    chr.set_page(1, 7);
    assert_eq!(chr.bank(1), 0);
  }
}
