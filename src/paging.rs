//! Encoder assignment paging
//!
//! Every configured bank (one per assign button) holds logical pages of
//! encoder assignments. A logical page longer than the number of encoders is
//! split into consecutive physical pages. Each physical page becomes one
//! sub-page of the "Encoders" area plus a flip twin in which faders and
//! encoders trade places. Page numbers below are physical page indices; the
//! sub-page of page `p` is `2p`, its flip twin `2p + 1`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EncoderBankConfig;
use crate::context::Context;
use crate::host::SubPageArea;
use crate::state::CallbackCollection;
use crate::xtouch::DisplayMode;

/// What one encoder controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderAssignment {
    #[serde(default)]
    pub display_mode: DisplayMode,
    pub parameter: String,
    /// Parameter toggled by pushing the encoder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_toggle: Option<String>,
}

/// Assignment repeated for every channel; `{channel}` is the 1-based channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTemplate {
    #[serde(default)]
    pub display_mode: DisplayMode,
    pub parameter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_toggle: Option<String>,
}

/// Replace `{channel}` by the 1-based number of a global channel
pub fn expand_channel_template(template: &str, global_channel: usize) -> String {
    template.replace("{channel}", &(global_channel + 1).to_string())
}

impl ChannelTemplate {
    pub fn expand(&self, global_channel: usize) -> EncoderAssignment {
        EncoderAssignment {
            display_mode: self.display_mode,
            parameter: expand_channel_template(&self.parameter, global_channel),
            push_toggle: self
                .push_toggle
                .as_ref()
                .map(|p| expand_channel_template(p, global_channel)),
        }
    }
}

/// Split an assignment list into physical pages of at most `encoder_count`
///
/// An empty list still yields one (empty) page.
pub fn split_assignments(assignments: &[EncoderAssignment], encoder_count: usize) -> Vec<Vec<EncoderAssignment>> {
    if assignments.is_empty() || encoder_count == 0 {
        return vec![Vec::new()];
    }
    assignments
        .chunks(encoder_count)
        .map(<[EncoderAssignment]>::to_vec)
        .collect()
}

/// One page worth of encoder assignments
#[derive(Debug, Clone)]
pub struct PhysicalPage {
    pub bank: usize,
    /// Logical page inside the bank
    pub logical: usize,
    /// Position among the physical pages of the logical page
    pub chunk: usize,
    pub chunk_count: usize,
    pub name: String,
    pub assignments: Vec<EncoderAssignment>,
}

impl PhysicalPage {
    /// Assignment of an encoder; `None` leaves it inert
    pub fn assignment(&self, channel: usize) -> Option<&EncoderAssignment> {
        self.assignments.get(channel)
    }

    /// `<page><count>` for split logical pages
    pub fn assignment_label(&self) -> Option<String> {
        (self.chunk_count > 1).then(|| format!("{}{}", self.chunk + 1, self.chunk_count))
    }
}

#[derive(Debug, Clone)]
pub struct Bank {
    pub name: String,
    pub button: u8,
    /// Physical pages in cycling order
    pub pages: Vec<usize>,
}

/// Active physical page and whether it is flipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePage {
    pub page: usize,
    pub flipped: bool,
}

impl ActivePage {
    fn sub_page(self) -> usize {
        self.page * 2 + self.flipped as usize
    }

    fn from_sub_page(index: usize) -> Self {
        Self {
            page: index / 2,
            flipped: index % 2 == 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncoderPaging {
    area: SubPageArea,
    pages: Vec<PhysicalPage>,
    banks: Vec<Bank>,
    on_page_activated: CallbackCollection<ActivePage>,
}

impl EncoderPaging {
    pub fn new(bank_configs: &[EncoderBankConfig], encoder_count: usize) -> Self {
        let mut pages = Vec::new();
        let mut banks = Vec::new();

        for (bank_index, bank) in bank_configs.iter().enumerate() {
            let mut bank_pages = Vec::new();
            for (logical, page) in bank.pages.iter().enumerate() {
                let chunks = split_assignments(&page.assignments_for(encoder_count), encoder_count);
                let chunk_count = chunks.len();
                for (chunk, assignments) in chunks.into_iter().enumerate() {
                    bank_pages.push(pages.len());
                    pages.push(PhysicalPage {
                        bank: bank_index,
                        logical,
                        chunk,
                        chunk_count,
                        name: format!("{}/{} {}", bank.name, page.name, chunk + 1),
                        assignments,
                    });
                }
            }
            banks.push(Bank {
                name: bank.name.clone(),
                button: bank.button,
                pages: bank_pages,
            });
        }

        let names = pages
            .iter()
            .flat_map(|p| [p.name.clone(), format!("{} (flip)", p.name)]);
        let area = SubPageArea::new("Encoders", names);

        let on_page_activated = CallbackCollection::new();
        for sub_page in area.sub_pages() {
            let hooks = CallbackCollection::attach(sub_page.on_activate());
            let dispatch = on_page_activated.clone();
            let active = ActivePage::from_sub_page(sub_page.index());
            hooks.add_callback(move |ctx, ()| dispatch.run(ctx, active));
        }

        debug!("Encoder paging: {} banks, {} physical pages", banks.len(), pages.len());
        Self {
            area,
            pages,
            banks,
            on_page_activated,
        }
    }

    pub fn area(&self) -> &SubPageArea {
        &self.area
    }

    pub fn pages(&self) -> &[PhysicalPage] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&PhysicalPage> {
        self.pages.get(index)
    }

    pub fn banks(&self) -> &[Bank] {
        &self.banks
    }

    /// Bank whose assign button is `note`
    pub fn bank_for_button(&self, note: u8) -> Option<usize> {
        self.banks.iter().position(|b| b.button == note)
    }

    /// Runs after every activation with the newly active page
    pub fn on_page_activated(&self) -> &CallbackCollection<ActivePage> {
        &self.on_page_activated
    }

    pub fn active(&self, ctx: &Context<'_>) -> Option<ActivePage> {
        self.area.active(ctx).map(ActivePage::from_sub_page)
    }

    pub fn active_page(&self, ctx: &Context<'_>) -> Option<&PhysicalPage> {
        self.active(ctx).and_then(|a| self.pages.get(a.page))
    }

    pub fn is_flipped(&self, ctx: &Context<'_>) -> bool {
        self.active(ctx).is_some_and(|a| a.flipped)
    }

    pub fn activate(&self, ctx: &mut Context<'_>, active: ActivePage) {
        self.area.activate(ctx, active.sub_page());
    }

    /// Assign button: first page of the bank, or the next one if the bank is
    /// already showing; the flip state is kept
    pub fn press_assign(&self, ctx: &mut Context<'_>, bank: usize) -> bool {
        let Some(bank_pages) = self.banks.get(bank).map(|b| &b.pages) else {
            return false;
        };
        let Some(&first) = bank_pages.first() else {
            return false;
        };

        let current = self.active(ctx);
        let flipped = current.is_some_and(|a| a.flipped);
        let page = current
            .and_then(|a| bank_pages.iter().position(|&p| p == a.page))
            .map(|pos| bank_pages[(pos + 1) % bank_pages.len()])
            .unwrap_or(first);

        info!("Encoder page → {}", self.pages[page].name);
        self.activate(ctx, ActivePage { page, flipped });
        true
    }

    /// Swap the active page with its flip twin
    pub fn toggle_flip(&self, ctx: &mut Context<'_>) -> bool {
        let Some(active) = self.active(ctx) else {
            return false;
        };
        self.activate(
            ctx,
            ActivePage {
                page: active.page,
                flipped: !active.flipped,
            },
        );
        true
    }

    /// Move by `delta` physical pages inside the active logical page
    ///
    /// Returns false at either end; there is no wrap-around.
    pub fn navigate(&self, ctx: &mut Context<'_>, delta: isize) -> bool {
        let Some(active) = self.active(ctx) else {
            return false;
        };
        let Some(current) = self.pages.get(active.page) else {
            return false;
        };

        let target = current.chunk as isize + delta;
        if target < 0 || target >= current.chunk_count as isize {
            return false;
        }

        let page = active.page - current.chunk + target as usize;
        self.activate(
            ctx,
            ActivePage {
                page,
                flipped: active.flipped,
            },
        );
        true
    }
}
