//! `mmc_boot`: bring up the card on one controller and boot from it

use dma_pool::DmaPool;
use sdmc::{Card, CardRegistry, HostController, SdmcConfig};
use storage::{BlockDeviceBackend, PartitionTable};

use crate::bprintln;
use crate::cmd::{attempt, BootContext};
use crate::APPLICATION_PART;

/// Boot from the card behind `host`.
///
/// `layout` is the board's partition descriptor string; the container is
/// expected in the partition named [`APPLICATION_PART`]. The DMA pool is
/// brought up here if the platform has not done so already.
pub fn mmc_boot<H: HostController>(
    ctx: &mut BootContext<'_>,
    host: H,
    config: SdmcConfig,
    layout: &str,
) -> i32 {
    let index = host.index();
    bprintln!("mmc_boot: controller {}", index);

    DmaPool::init_static();

    let card = match Card::identify(host, config) {
        Ok(card) => card,
        Err(err) => {
            bprintln!("mmc_boot: identification failed: {err}");
            return 1;
        }
    };

    // One registry per boot attempt, dropped with it
    let mut cards = CardRegistry::new();
    if cards.insert(card).is_err() {
        bprintln!("mmc_boot: controller {} has no registry slot", index);
        return 1;
    }
    let Some(card) = cards.get_mut(index) else {
        return 1;
    };

    let capacity = card.state().geometry.capacity_kb * 1024;
    let table = match PartitionTable::from_descriptor(layout, capacity) {
        Ok(table) => table,
        Err(err) => {
            bprintln!("mmc_boot: bad partition layout: {err}");
            return 1;
        }
    };
    let (base, size) = match table.find(APPLICATION_PART) {
        Ok(part) => (part.start, part.size),
        Err(err) => {
            bprintln!("mmc_boot: {err}");
            return 1;
        }
    };

    let mut backend = match BlockDeviceBackend::new(card, base, size) {
        Ok(backend) => backend,
        Err(err) => {
            bprintln!("mmc_boot: backend setup failed: {err}");
            return 1;
        }
    };
    attempt(&mut backend, ctx)
}
