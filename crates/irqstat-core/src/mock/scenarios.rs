//! Pre-built mock filesystem scenarios for testing.

use super::filesystem::MockFs;

impl MockFs {
    /// Creates a typical 4-CPU laptop-ish system.
    ///
    /// Includes the legacy timer/rtc/acpi lines, a multi-action shared IRQ,
    /// MSI-X queues of a NIC, an IRQ without a registered action, and the
    /// trailing architecture specific rows of `/proc/interrupts`.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.set_interrupts(
            "\
            CPU0       CPU1       CPU2       CPU3
   0:         44          0          0          0  IR-IO-APIC    2-edge      timer
   8:          0          0          1          0  IR-IO-APIC    8-edge      rtc0
   9:          0       1234          0          0  IR-IO-APIC    9-fasteoi   acpi
  16:       5021          0        311          0  IR-IO-APIC   16-fasteoi   i801_smbus, idma64.0
 120:          0          0          0          0  DMAR-MSI    0-edge      dmar0
 124:   12345678          0          0     987654  IR-PCI-MSIX-0000:00:14.0    0-edge      xhci_hcd
 125:          0     443322          0          0  IR-PCI-MSIX-0000:03:00.0    0-edge      enp3s0-rx-0
 126:          0          0     554433          0  IR-PCI-MSIX-0000:03:00.0    1-edge      enp3s0-tx-0
 NMI:          7          6          5          4   Non-maskable interrupts
 LOC:    1234567    2345678    3456789    4567890   Local timer interrupts
 ERR:          0
 MIS:          0
",
        );

        fs.add_irq(0, "timer\n", "0\n");
        fs.add_irq(8, "rtc0\n", "2\n");
        fs.add_irq(9, "acpi\n", "1\n");
        fs.add_irq(16, "i801_smbus,idma64.0\n", "0,2\n");
        fs.add_irq(120, "dmar0\n", "0-3\n");
        fs.add_irq(124, "xhci_hcd\n", "0\n");
        fs.add_irq(125, "enp3s0-rx-0\n", "1\n");
        fs.add_irq(126, "enp3s0-tx-0\n", "2\n");
        // Allocated but not requested by any driver: no actions, and the
        // kernel shows an empty effective affinity.
        fs.add_irq(127, "\n", "\n");

        fs
    }

    /// Creates `count` IRQs numbered from 0, each with one action and a
    /// single-CPU affinity, plus a matching `/proc/interrupts` for 2 CPUs.
    pub fn with_irqs(count: u32) -> Self {
        let mut fs = Self::new();
        let mut table = String::from("           CPU0       CPU1\n");
        for irq in 0..count {
            fs.add_irq(irq, &format!("dev{}\n", irq), &format!("{}\n", irq % 2));
            table.push_str(&format!(
                "{:>4}: {:>10} {:>10}  PCI-MSI  {}-edge  dev{}\n",
                irq,
                irq * 10,
                irq * 10 + 1,
                irq,
                irq
            ));
        }
        fs.set_interrupts(&table);
        fs
    }
}
