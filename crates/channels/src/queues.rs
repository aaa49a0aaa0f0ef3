use {chatbridge_broker::Queue, chatbridge_common::Platform};

/// Which relay queue each platform fills and drains.
pub trait PlatformQueues {
    /// Queue this platform's adapter pushes observed messages onto.
    fn outbound_queue(&self) -> Queue;
    /// Queue this platform's adapter drains and delivers from.
    fn inbound_queue(&self) -> Queue;
}

impl PlatformQueues for Platform {
    fn outbound_queue(&self) -> Queue {
        match self {
            Platform::Discord => Queue::DiscordToWhatsapp,
            Platform::Whatsapp => Queue::WhatsappToDiscord,
        }
    }

    fn inbound_queue(&self) -> Queue {
        self.opposite().outbound_queue()
    }
}
