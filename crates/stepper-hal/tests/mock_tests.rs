//! Behaviour tests for the mock platform.

use stepper_hal::mock::{MockI2c, MockPlatform, MockSpi};
use stepper_hal::prelude::*;

mod platform_wiring {
    use super::*;

    #[test]
    fn test_idle_levels_match_reference_board() -> Result<(), Box<dyn std::error::Error>> {
        let (mut parts, _handles) = MockPlatform::standard();

        assert!(parts.estop_a.is_high()?, "NC loop idles high");
        let estop_b = parts.estop_b.as_mut().ok_or("dual channel expected")?;
        assert!(estop_b.is_low()?, "complement idles low");
        assert!(parts.driver_flag.is_high()?, "open-drain FLAG idles high");
        Ok(())
    }

    #[test]
    fn test_handles_drive_parts() -> Result<(), Box<dyn std::error::Error>> {
        let (mut parts, handles) = MockPlatform::standard();

        handles.press_estop();
        assert!(!parts.estop_a.is_high()?);
        let estop_b = parts.estop_b.as_mut().ok_or("dual channel expected")?;
        assert!(estop_b.is_high()?);

        parts.driver_standby.set_high()?;
        assert!(handles.driver_standby.level());
        assert_eq!(handles.driver_standby.writes().len(), 1);

        handles.clock.advance_ms(25);
        assert_eq!(parts.clock.now_us(), 25_000);
        Ok(())
    }

    #[test]
    fn test_optional_parts_follow_options() {
        let (parts, _handles) = MockPlatform {
            watchdog_kind: WatchdogKind::Window,
            dual_channel: false,
            encoder: false,
        }
        .parts();

        assert!(parts.estop_b.is_none());
        assert!(parts.encoder_i2c.is_none());
        assert_eq!(parts.watchdog.kind(), WatchdogKind::Window);
    }

    #[test]
    fn test_watchdog_reset_flag_passthrough() {
        let (parts, handles) = MockPlatform::standard();
        assert!(!parts.watchdog.reset_caused_by_watchdog());
        handles.watchdog.set_reset_flag(true);
        assert!(parts.watchdog.reset_caused_by_watchdog());
    }
}

mod fault_injection {
    use super::*;

    #[test]
    fn test_pin_read_failure_reports_gpio_error() {
        let (mut parts, handles) = MockPlatform::standard();
        handles.estop_a.fail_reads(true);
        assert_eq!(parts.estop_a.is_high(), Err(HalError::Gpio));
        handles.estop_a.fail_reads(false);
        assert_eq!(parts.estop_a.is_high(), Ok(true));
    }

    #[test]
    fn test_spi_responder_sees_every_frame() -> Result<(), Box<dyn std::error::Error>> {
        let mut spi = MockSpi::new();
        spi.set_responder(Box::new(|mosi: &[u8]| {
            Some(mosi.iter().map(|b| !b).collect::<Vec<u8>>())
        }));

        let mut frame = [0x0F, 0xF0];
        spi.transfer_in_place(&mut frame)?;
        assert_eq!(frame, [0xF0, 0x0F]);
        assert_eq!(spi.frames(), vec![vec![0x0F, 0xF0]]);
        Ok(())
    }

    #[test]
    fn test_spi_persistent_failure() {
        let mut spi = MockSpi::new();
        spi.fail_all(Some(BusErrorKind::ModeFault));
        assert_eq!(spi.write(&[0x00]), Err(HalError::spi(BusErrorKind::ModeFault)));
        spi.fail_all(None);
        assert_eq!(spi.write(&[0x00]), Ok(()));
    }

    #[test]
    fn test_i2c_nack_toggle() -> Result<(), Box<dyn std::error::Error>> {
        let mut bus = MockI2c::new();
        bus.set_register(0x36, 0x0B, 0x20);
        bus.set_nack(0x36, true);

        let mut status = [0u8; 1];
        assert_eq!(
            bus.read_register(0x36, 0x0B, &mut status),
            Err(HalError::i2c(0x36, BusErrorKind::Nack))
        );

        bus.set_nack(0x36, false);
        bus.read_register(0x36, 0x0B, &mut status)?;
        assert_eq!(status, [0x20]);
        assert_eq!(bus.transaction_count(), 2);
        Ok(())
    }

    #[test]
    fn test_i2c_write_auto_increments() -> Result<(), Box<dyn std::error::Error>> {
        let mut bus = MockI2c::new();
        bus.attach(0x36);
        bus.write(0x36, &[0x01, 0xAA, 0xBB])?;
        assert_eq!(bus.register(0x36, 0x01), Some(0xAA));
        assert_eq!(bus.register(0x36, 0x02), Some(0xBB));
        Ok(())
    }
}

mod display_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_hal_error_messages() {
        assert_snapshot!(HalError::spi(BusErrorKind::Overrun).to_string(), @"SPI transfer failed: overrun");
        assert_snapshot!(HalError::i2c(0x36, BusErrorKind::ArbitrationLoss).to_string(), @"I2C transfer to 0x36 failed: arbitration lost");
        assert_snapshot!(HalError::watchdog("timing does not match peripheral").to_string(), @"watchdog peripheral error: timing does not match peripheral");
        assert_snapshot!(HalError::NotInitialized.to_string(), @"peripheral not initialized");
    }

    #[test]
    fn test_watchdog_kind_names() {
        assert_snapshot!(WatchdogKind::Independent.to_string(), @"IWDG");
        assert_snapshot!(WatchdogKind::Window.to_string(), @"WWDG");
    }
}
