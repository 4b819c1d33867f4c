use crate::wasm_frame_t;
use std::mem;
use std::ptr;

macro_rules! declare_vecs {
    (
        $((
            name: $name:ident,
            ty: $elem_ty:ty,
            delete: $delete:ident,
        ))*
    ) => {$(
        #[repr(C)]
        pub struct $name {
            pub size: usize,
            pub data: *mut $elem_ty,
        }

        impl $name {
            pub fn set_buffer(&mut self, buffer: Vec<$elem_ty>) {
                let mut vec = buffer.into_boxed_slice();
                self.size = vec.len();
                self.data = vec.as_mut_ptr();
                mem::forget(vec);
            }

            pub fn as_slice(&self) -> &[$elem_ty] {
                unsafe { crate::slice_from_raw_parts(self.data, self.size) }
            }

            pub fn take(&mut self) -> Vec<$elem_ty> {
                if self.data.is_null() {
                    return Vec::new();
                }
                let vec = unsafe {
                    Vec::from_raw_parts(self.data, self.size, self.size)
                };
                self.size = 0;
                self.data = ptr::null_mut();
                vec
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name {
                    size: 0,
                    data: ptr::null_mut(),
                }
            }
        }

        impl From<Vec<$elem_ty>> for $name {
            fn from(vec: Vec<$elem_ty>) -> Self {
                let mut out = $name::default();
                out.set_buffer(vec);
                out
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                drop(self.take());
            }
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn $delete(out: &mut $name) {
            out.take();
        }
    )*};
}

declare_vecs! {
    (
        name: wasm_byte_vec_t,
        ty: u8,
        delete: wasm_byte_vec_delete,
    )
    (
        name: wasm_frame_vec_t,
        ty: Option<Box<wasm_frame_t>>,
        delete: wasm_frame_vec_delete,
    )
}

pub type wasm_name_t = wasm_byte_vec_t;
