//! Live capture over an AF_PACKET socket (Linux).
//!
//! The socket is bound to one interface and read with a receive
//! timeout, so the session loop regains control at least every poll
//! interval to service break and info flags.  Kernel counters come
//! from `PACKET_STATISTICS`.

use std::io;

#[cfg(target_os = "linux")]
pub use imp::LiveSource;

#[cfg(target_os = "linux")]
mod imp {
    use std::io;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    use crate::capture::source::{CaptureStats, NextPacket, PacketSource};
    use crate::config::LIVE_READ_TIMEOUT_MS;
    use crate::dissect::registry::LINKTYPE_EN10MB;
    use crate::dissect::PacketHeader;

    pub struct LiveSource {
        fd: OwnedFd,
        snaplen: u32,
        buf: Vec<u8>,
    }

    fn last_err() -> io::Error {
        io::Error::last_os_error()
    }

    impl LiveSource {
        /// Opens `iface` for capture.  Requires CAP_NET_RAW; the caller
        /// drops privileges afterwards.
        pub fn open(iface: &str, snaplen: u32, promisc: bool) -> io::Result<Self> {
            // SAFETY: plain socket syscalls with stack-local arguments;
            // the fd is owned immediately after creation.
            unsafe {
                let proto = (libc::ETH_P_ALL as u16).to_be() as libc::c_int;
                let raw = libc::socket(libc::AF_PACKET, libc::SOCK_RAW, proto);
                if raw < 0 {
                    return Err(last_err());
                }
                let fd = OwnedFd::from_raw_fd(raw);

                let ifindex = {
                    let c = std::ffi::CString::new(iface).map_err(|_| {
                        io::Error::new(io::ErrorKind::InvalidInput, "interface name contains NUL")
                    })?;
                    let idx = libc::if_nametoindex(c.as_ptr());
                    if idx == 0 {
                        return Err(last_err());
                    }
                    idx as libc::c_int
                };

                let mut sll: libc::sockaddr_ll = std::mem::zeroed();
                sll.sll_family = libc::AF_PACKET as u16;
                sll.sll_protocol = (libc::ETH_P_ALL as u16).to_be();
                sll.sll_ifindex = ifindex;
                if libc::bind(
                    fd.as_raw_fd(),
                    &sll as *const libc::sockaddr_ll as *const libc::sockaddr,
                    std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
                ) < 0
                {
                    return Err(last_err());
                }

                if promisc {
                    let mut mreq: libc::packet_mreq = std::mem::zeroed();
                    mreq.mr_ifindex = ifindex;
                    mreq.mr_type = libc::PACKET_MR_PROMISC as u16;
                    if libc::setsockopt(
                        fd.as_raw_fd(),
                        libc::SOL_PACKET,
                        libc::PACKET_ADD_MEMBERSHIP,
                        &mreq as *const libc::packet_mreq as *const libc::c_void,
                        std::mem::size_of::<libc::packet_mreq>() as libc::socklen_t,
                    ) < 0
                    {
                        return Err(last_err());
                    }
                }

                let tv = libc::timeval {
                    tv_sec: (LIVE_READ_TIMEOUT_MS / 1000) as libc::time_t,
                    tv_usec: ((LIVE_READ_TIMEOUT_MS % 1000) * 1000) as libc::suseconds_t,
                };
                if libc::setsockopt(
                    fd.as_raw_fd(),
                    libc::SOL_SOCKET,
                    libc::SO_RCVTIMEO,
                    &tv as *const libc::timeval as *const libc::c_void,
                    std::mem::size_of::<libc::timeval>() as libc::socklen_t,
                ) < 0
                {
                    return Err(last_err());
                }

                Ok(LiveSource {
                    fd,
                    snaplen,
                    buf: vec![0u8; snaplen as usize],
                })
            }
        }
    }

    impl PacketSource for LiveSource {
        fn next_packet(&mut self) -> io::Result<NextPacket<'_>> {
            // SAFETY: buf outlives the call; MSG_TRUNC makes the return
            // value the wire length even when the buffer was shorter.
            let n = unsafe {
                libc::recv(
                    self.fd.as_raw_fd(),
                    self.buf.as_mut_ptr() as *mut libc::c_void,
                    self.buf.len(),
                    libc::MSG_TRUNC,
                )
            };
            if n < 0 {
                let e = last_err();
                return match e.kind() {
                    io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted => Ok(NextPacket::Timeout),
                    _ => Err(e),
                };
            }
            let wirelen = n as usize;
            let caplen = wirelen.min(self.buf.len()) as u32;

            let mut tv = libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            };
            // SAFETY: out-param only.
            unsafe {
                libc::gettimeofday(&mut tv, std::ptr::null_mut());
            }
            let h = PacketHeader::new(
                tv.tv_sec as u32,
                tv.tv_usec as u32,
                caplen,
                wirelen as u32,
            );
            Ok(NextPacket::Packet(h, &self.buf[..caplen as usize]))
        }

        fn datalink(&self) -> u32 {
            LINKTYPE_EN10MB
        }

        fn snaplen(&self) -> u32 {
            self.snaplen
        }

        fn stats(&mut self) -> Option<CaptureStats> {
            let mut st: libc::tpacket_stats = unsafe { std::mem::zeroed() };
            let mut len = std::mem::size_of::<libc::tpacket_stats>() as libc::socklen_t;
            // SAFETY: kernel fills the struct up to len.
            let rc = unsafe {
                libc::getsockopt(
                    self.fd.as_raw_fd(),
                    libc::SOL_PACKET,
                    libc::PACKET_STATISTICS,
                    &mut st as *mut libc::tpacket_stats as *mut libc::c_void,
                    &mut len,
                )
            };
            if rc < 0 {
                return None;
            }
            Some(CaptureStats {
                recv: st.tp_packets,
                dropped: st.tp_drops,
                ifdrop: 0,
            })
        }

        fn is_live(&self) -> bool {
            true
        }
    }
}

/// Opens a live source, or explains that the platform has no backend.
#[cfg(target_os = "linux")]
pub fn open(iface: &str, snaplen: u32, promisc: bool) -> io::Result<LiveSource> {
    LiveSource::open(iface, snaplen, promisc)
}

#[cfg(not(target_os = "linux"))]
pub fn open(
    _iface: &str,
    _snaplen: u32,
    _promisc: bool,
) -> io::Result<super::source::OfflineSource> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "live capture is not supported on this platform",
    ))
}
